pub mod clock;
pub mod slot;

pub use clock::Clock;
pub use slot::{Scheduler, TimerSlot};
