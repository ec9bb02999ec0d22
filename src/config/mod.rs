//! Configuration management
//!
//! Node settings (listen address, seeds, data directory, timers, timeouts and
//! chain parameters) loaded from defaults, an optional TOML file and the
//! environment, then adjusted by command-line flags.

pub mod settings;

pub use settings::{Config, NodeSettings, GLOBAL_CONFIG};
