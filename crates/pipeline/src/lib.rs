//! Design persistence pipeline.
//!
//! [`DesignService`] makes a design durable in a fixed order: rehost
//! third-party images ([`ResourcePersister`]), render a preview, write the
//! structured summary, then hand the full document to the background
//! [`DocumentWriter`]. Reads reverse it, overlaying the full document from
//! blob storage onto the stored summary.

pub mod resources;
pub mod service;
pub mod stored;
pub mod writer;

pub use resources::{FeedDomains, HttpFetcher, ResourcePersister};
pub use service::DesignService;
pub use stored::StoredDesign;
pub use writer::{DocumentWriter, DocumentWriterConfig, WriterHandle};
