//! Core library for the `llm-probe` CLI.
//!
//! This crate defines:
//! - Layered configuration (defaults, config file, environment, overrides)
//! - The completion-client abstraction and its Anthropic Messages implementation
//! - Error classification and the console report for a single probe run
//!
//! It is used by `llm-probe-cli`, but the probe can be embedded anywhere that
//! can supply a [`std::io::Write`] sink.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod probe;
pub mod report;

pub use client::{AnthropicClient, CompletionClient};
pub use config::{FileConfig, Overrides, ProbeConfig};
pub use error::{ApiError, ApiFault, ErrorKind};
pub use model::{MessageRequest, MessageResponse, ProbeResult};
pub use probe::{run_probe, run_probe_with};
