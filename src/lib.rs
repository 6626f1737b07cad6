// Library module for outflow
// Re-exports modules for use in integration tests and external crates

pub mod catalog;
pub mod config;
pub mod error;
pub mod remote;
pub mod sync;
