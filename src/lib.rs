//! docent - document-grounded conversational assistant
//!
//! This is the convenience wrapper crate that re-exports the docent
//! components.
//!
//! # Quick Start
//!
//! ```toml
//! [dependencies]
//! docent = "0.1"
//! ```
//!
//! ```no_run
//! use docent::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_default();
//! let provider = Arc::new(OllamaProvider::from_config(&config.llm));
//! let mut session = Session::new(config, provider)?;
//!
//! session.ingest(vec![Upload::from_path("handbook.pdf")?]).await?;
//! println!("{}", session.ask("How many vacation days do I get?").await?.output);
//! # Ok(())
//! # }
//! ```

// Re-export core
pub use docent_core::*;
pub use docent_plugin;

/// Prelude module for convenient imports
pub mod prelude {
    pub use async_trait::async_trait;
    pub use docent_core::*;
    pub use docent_plugin::{Plugin, PluginError, PluginOutput, PluginRegistry};
}
