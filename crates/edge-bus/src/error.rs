//! # Bus Errors
//!
//! This module defines the error type shared by every module attached to the bus.
//! Routing failures name the module or group that could not be reached so the
//! message can be reported back to whoever sent it.

use std::time::Duration;

/// Errors raised while routing a message between modules.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BusError {
    #[error("module not registered: {0}")]
    ModuleNotFound(String),
    #[error("no module registered in group: {0}")]
    GroupNotFound(String),
    #[error("module {0} stopped receiving messages")]
    ModuleClosed(String),
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),
}
