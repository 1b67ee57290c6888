//! CLI command modules.

pub mod food;
pub mod http;
pub mod status;
