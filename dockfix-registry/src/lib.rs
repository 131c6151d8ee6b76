//! Registry clients for dockfix.
//!
//! Three stateless, paginated readers share one transport and one
//! `ResolverConfig`:
//! - [`ImageTagClient`] for Docker Hub tags,
//! - [`SeriesClient`] for Launchpad distribution series,
//! - [`ArchiveClient`] for Launchpad published binaries.

pub mod config;
pub mod error;
pub mod fetch;
pub mod hub;
pub mod launchpad;
pub mod page;
pub mod transport;

pub use config::{ResolverConfig, pace};
pub use error::RegistryError;
pub use fetch::fetch_json;
pub use hub::{ImageTag, ImageTagClient, ImageVariant, image_path};
pub use launchpad::{ArchiveClient, BinaryPublication, SeriesClient, SeriesInfo};
pub use page::RegistryPage;
pub use transport::{HttpResponse, HttpTransport, MemoryTransport, TransportError, UreqTransport};
