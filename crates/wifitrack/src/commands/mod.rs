//! Command handlers: CLI args -> entry replay / config -> output formatting.

pub mod config_cmd;
pub mod replay;
