//! Core traits and types for cycle-accurate emulation.
//!
//! Everything ticks at the machine's bus frequency. All component timing
//! derives from this. No exceptions.

mod bus;
mod clock;
mod observable;
mod tickable;
mod ticks;

pub use bus::{Bus, SimpleBus};
pub use clock::MasterClock;
pub use observable::{Observable, Value};
pub use tickable::Tickable;
pub use ticks::Ticks;
