//! Core module - data model and shared utilities
//!
//! This module provides:
//! - Resolved run configuration
//! - File records and run summary
//! - Error types
//! - The per-run ignore set
//! - Path normalization
//! - Local token counting
//! - Cancellation and other utilities

pub mod config;
pub mod error;
pub mod ignore_set;
pub mod model;
pub mod paths;
pub mod tokenizer;
pub mod util;
