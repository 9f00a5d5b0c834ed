//! Session event bus and event types.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{SessionEvent, Topic};
