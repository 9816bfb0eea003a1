//! Configuration, logging, and command execution for the `nsid` binary.
//!
//! ## Structure
//!
//! - [`config`] - command-line and environment parsing (`CliArgs`, `CliConfig`).
//! - [`commands`] - runs a validated command against the registry.
//! - [`telemetry`] - `tracing` subscriber setup.

pub mod commands;
pub mod config;
pub mod telemetry;
