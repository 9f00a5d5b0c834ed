//! Types downstream clients interact with.

mod errors;
mod handle;
mod providers;

pub use errors::{Result, SessionError};
pub use handle::SessionHandle;
pub use providers::{ActionProvider, ChannelProvider, ScriptedProvider};
