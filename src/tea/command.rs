//! Commands for the TEA (The Elm Architecture) pattern.
//!
//! Commands are outputs from the update function - they represent side effects
//! to be executed by the runtime.

use crate::store::RemoteCall;

/// Output commands from the update function.
#[derive(Debug)]
pub enum Command {
    /// Execute a directory call; its completion comes back as `Message::Remote`.
    Remote(RemoteCall),

    // App lifecycle
    Quit,
}

impl Command {
    pub fn remote(&self) -> Option<&RemoteCall> {
        match self {
            Command::Remote(call) => Some(call),
            Command::Quit => None,
        }
    }
}
