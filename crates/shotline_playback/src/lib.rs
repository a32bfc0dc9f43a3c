pub mod clock;
pub mod driver;
pub mod error;

pub use clock::{PlaybackClock, PlaybackState, StepDirection, TickOutcome, TickToken};
pub use driver::PlaybackDriver;
