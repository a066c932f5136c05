//! Utility functions and helpers.

pub mod http;
pub mod progress;
pub mod retry;
pub mod set;
pub mod shutdown;
pub mod url;
