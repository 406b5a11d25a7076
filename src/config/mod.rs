//! Configuration management module
//!
//! Loads probe settings from environment variables and the optional target matrix file

pub mod file;
pub mod settings;

pub use file::{resolve_targets, Target, TargetConfig, TargetsFile};
pub use settings::Settings;
