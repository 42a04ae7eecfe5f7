//! Built-in tools exposed to the agent.

mod search_docs;

pub use search_docs::{
    format_results, SearchDocsPlugin, NO_DOCUMENTS_MESSAGE, NO_MATCHES_MESSAGE, SEARCH_DOCS_TOOL,
};
