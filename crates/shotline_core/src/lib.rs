pub mod config;
pub mod conflicts;
pub mod editing;
pub mod editor;
pub mod error;
pub mod events;
pub mod history;
pub mod project;
pub mod snapping;
pub mod transitions;
pub mod types;
pub mod viewport;
