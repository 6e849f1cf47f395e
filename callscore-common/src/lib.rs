//! # callscore common library
//!
//! Shared code for the callscore crates:
//! - Error type used by storage and configuration code
//! - Bootstrap configuration (TOML + environment) and root folder resolution
//! - Storage folder layout shared by every component that reads or writes records

pub mod config;
pub mod error;

pub use config::{LoggingConfig, StorageLayout, TomlConfig};
pub use error::{Error, Result};
