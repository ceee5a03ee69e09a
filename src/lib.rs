// ABOUTME: Library root for hoist - exposes the build, publish, and deploy pipeline.
// ABOUTME: The main binary is in main.rs.

pub mod build;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod registry;
pub mod remote;
pub mod ssh;
pub mod types;
