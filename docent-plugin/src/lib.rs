//! Tool registration for the docent agent.
//!
//! A [`Plugin`] is a named capability the model can call by emitting its
//! name in an `Action:` line. A [`PluginRegistry`] holds the tools of one
//! agent, with unique names, in registration order.

mod plugin;
mod registry;

pub use plugin::{Plugin, PluginError, PluginOutput, Result};
pub use registry::PluginRegistry;
