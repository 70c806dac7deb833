pub mod api;
pub mod board;
pub mod config;
pub mod core;
pub mod drag;
pub mod error;
pub mod log;
pub mod scope;
pub mod session;
pub mod store;
pub mod transition;

// Decoupled game loop architecture
pub mod app;
pub mod render;
pub mod tea;
pub mod ui;

pub use error::{Error, Result};
pub use session::{Session, SessionManager};
