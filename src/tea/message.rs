//! Messages for the TEA (The Elm Architecture) pattern.
//!
//! Messages are inputs to the update function - they come from the terminal
//! or from remote calls completing.

use crossterm::event::{KeyEvent, MouseEvent};

use crate::store::Completion;

/// Input messages to the update function.
#[derive(Debug)]
pub enum Message {
    // Keyboard/terminal events
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),

    /// A remote call finished (or failed).
    Remote(Completion),
}
