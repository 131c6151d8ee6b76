//! Version resolution for dockfix.
//!
//! Combines the registry clients with a container [`Probe`] to answer the
//! questions pinning repairs ask. Absence is reported through
//! [`dockfix_types::Lookup`], never as an error.

pub mod image;
pub mod os_release;
pub mod ports;
pub mod resolver;
pub mod wildcard;

pub use image::ImageRef;
pub use os_release::{KNOWN_DISTROS, OsRelease, is_known_distro};
pub use ports::{Probe, ProbeError, ProbeStep};
pub use resolver::{OfflineResolver, PinFailure, PinOutcome, Resolve, VersionResolver};
pub use wildcard::{WildcardLevel, candidates};
