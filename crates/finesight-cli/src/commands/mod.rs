//! CLI command implementations
//!
//! - `core` - Init and recurring commands plus the shared `open_store`
//! - `serve` - Web server command

pub mod core;
pub mod serve;

// Re-export command functions for main.rs
pub use self::core::*;
pub use self::serve::*;
