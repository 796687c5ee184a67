/// Whether the loop wants another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Drives the tick callback. On an interactive host this wraps the display's
/// animation-timing primitive; in tests ticks are driven synchronously.
pub trait TickScheduler {
    fn run(&mut self, tick: &mut dyn FnMut() -> TickFlow);
}

/// Runs ticks back to back until the loop asks to stop. Suitable for offline
/// replay, where there is no display clock to pace against.
#[derive(Debug, Default)]
pub struct ImmediateScheduler;

impl TickScheduler for ImmediateScheduler {
    fn run(&mut self, tick: &mut dyn FnMut() -> TickFlow) {
        while tick() == TickFlow::Continue {}
    }
}
