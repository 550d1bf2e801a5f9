//! Rendering helpers for the kinko CLI.

pub mod format;
pub mod output;
