//! Process-level wiring: configuration and the dependency-injected service
//! state.

pub mod config;
pub mod state;

pub use config::Config;
pub use state::AppState;
