mod command;
mod controller;
mod progress;
mod ticker;

// Public API of the session subsystem.
pub use command::{CommandOutcome, SessionCommand};
pub use controller::SessionController;
pub use progress::SessionProgress;
pub use ticker::{IntervalTicks, TickSource};
