//! Core module - shared infrastructure for Toolbridge
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod logging;
pub mod providers;
pub mod types;

pub use config::{Config, RetryPolicy};
pub use error::{BridgeError, InvokeError, Result};
pub use providers::{ProviderSet, ToolProviderConfig};
pub use types::*;
