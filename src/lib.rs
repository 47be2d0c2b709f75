//! Spark connector library
//!
//! Binary-side glue for the coordinator: the headless runner that drives it
//! from scripted host and backend events.

pub mod headless;

// Re-export main entry points
pub use headless::runner::run_headless;
pub use headless::OutputMode;
