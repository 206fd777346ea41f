pub mod commands;
pub mod handler;
pub mod state;

pub use commands::Command;
pub use handler::ConcurrentHandler;
pub use state::{AppState, SharedState};
