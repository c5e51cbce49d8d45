//! flatconf CLI library
//!
//! Exposes the CLI entry point so embedders can bundle the binary.

mod cli;

pub use cli::run;
