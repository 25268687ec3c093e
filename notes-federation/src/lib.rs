pub mod types;
pub mod traits;
pub mod fetcher;
pub mod resolver;
pub mod discovery;
pub mod endpoint_manager;
pub mod store;
pub mod frontmatter;
pub mod parser;
pub mod aggregator;
pub mod query;

pub use types::*;
pub use traits::{EndpointStore, Transport};
pub use fetcher::Fetcher;
pub use resolver::resolve_url;
pub use discovery::{Discovered, Discovery};
pub use endpoint_manager::EndpointManager;
pub use store::{JsonFileStore, MemoryStore};
pub use frontmatter::FrontMatter;
pub use parser::{FileList, NoteNormalizer};
pub use aggregator::FederationAggregator;
pub use query::{filter_by_source, filter_by_tag, unique_sources, unique_tags};
