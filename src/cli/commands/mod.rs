//! Subcommand handlers

pub mod config;
pub mod message;
pub mod plot;
pub mod todo;
