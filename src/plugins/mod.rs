//! Plugin contract and registry.

mod base;
mod hooks;
mod registry;

pub use base::{Plugin, PreHookOutcome};
pub use hooks::FnPlugin;
pub use registry::PluginRegistry;
