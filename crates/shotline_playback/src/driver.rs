use crate::clock::{PlaybackClock, PlaybackState, TickOutcome, TickToken};
use shotline_core::types::TimeUs;
use std::cell::RefCell;
use std::rc::Rc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Tick the clock at its configured interval until the token is cancelled or
/// the end is reached. `on_tick` sees every advanced cursor position.
///
/// The clock is never borrowed across an await point, so the host can call
/// `pause`/`seek`/`set_speed` between ticks.
pub async fn run<F>(clock: Rc<RefCell<PlaybackClock>>, token: TickToken, mut on_tick: F) -> TickOutcome
where
    F: FnMut(TimeUs),
{
    let period = clock.borrow().tick_interval();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let outcome = clock.borrow_mut().tick(token);
        match outcome {
            TickOutcome::Advanced(cursor) => on_tick(cursor),
            done => return done,
        }
    }
}

/// Owns the tick task for one clock. Must be used from inside a tokio
/// `LocalSet`, since the clock is shared through `Rc<RefCell<_>>`.
pub struct PlaybackDriver {
    clock: Rc<RefCell<PlaybackClock>>,
    task: Option<JoinHandle<TickOutcome>>,
}

impl PlaybackDriver {
    pub fn new(clock: PlaybackClock) -> Self {
        Self {
            clock: Rc::new(RefCell::new(clock)),
            task: None,
        }
    }

    pub fn clock(&self) -> Rc<RefCell<PlaybackClock>> {
        Rc::clone(&self.clock)
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.borrow().state()
    }

    pub fn cursor(&self) -> TimeUs {
        self.clock.borrow().cursor()
    }

    /// Start (or resume) the tick task. A no-op while a task is already
    /// running for the current play session.
    pub fn play(&mut self, on_tick: impl FnMut(TimeUs) + 'static) {
        let running = self.task.as_ref().is_some_and(|t| !t.is_finished());
        if running && self.clock.borrow().is_playing() {
            return;
        }
        self.cancel_task();
        let token = self.clock.borrow_mut().play();
        self.task = Some(tokio::task::spawn_local(run(self.clock(), token, on_tick)));
    }

    /// Pause and cancel the tick task before returning.
    pub fn pause(&mut self) {
        self.clock.borrow_mut().pause();
        self.cancel_task();
    }

    pub fn stop(&mut self) {
        self.clock.borrow_mut().stop();
        self.cancel_task();
    }

    /// Wait for the current play session to end on its own or be cancelled.
    /// Returns `None` if nothing was playing.
    pub async fn finished(&mut self) -> Option<TickOutcome> {
        let task = self.task.take()?;
        Some(task.await.unwrap_or(TickOutcome::Cancelled))
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.cancel_task();
    }
}
