// src/config/mod.rs
pub mod watch;

pub use watch::{WatchConfig, ENV_CONFIG_PATH};
