//! CLI subcommand implementations.

pub mod chat;
pub mod config;
pub mod diagnose;
pub mod weather;
