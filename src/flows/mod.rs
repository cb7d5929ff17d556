//! Flows module - the census run
//!
//! Provides:
//! - walk: top-down traversal with ignore pruning and token counting
//! - report: sorted reports and the console summary
//! - census: wiring of config, collaborators, walk, and reports

pub mod census;
pub mod report;
pub mod walk;
