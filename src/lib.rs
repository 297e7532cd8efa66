//! archstrap library: the provisioning core and the CLI command handlers.
//!
//! Exposed as a library so integration tests can drive both stages with a
//! scripted command runner.

pub mod commands;
pub mod config;
pub mod deploy;
pub mod error;
pub mod install;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod spec;
pub mod timing;
