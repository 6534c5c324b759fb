//! deepsim CLI crate
//!
//! Command-line front end of `deepsim-runtime`: network description files in
//! TOML, a sample file generator, inspection, variable listing and a trial
//! runner writing JSON records.
//!
//! The binary (src/main.rs) wires up logging and argument parsing, calling
//! [`DeepsimCli::execute`]. Command modules are exposed as a library so they
//! can be driven from tests.

pub mod commands;
pub mod config;
pub mod error;
pub mod network_file;

pub use commands::DeepsimCli;
