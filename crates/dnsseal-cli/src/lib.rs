//! Command-line front end for dnsseal.
//!
//! Parses arguments, layers configuration, sets up logging and runs one
//! verify-then-seal pass. Ciphertext goes to stdout, everything else to
//! stderr.

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::run;
