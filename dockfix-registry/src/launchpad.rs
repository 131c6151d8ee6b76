use crate::config::{ResolverConfig, pace};
use crate::error::RegistryError;
use crate::fetch::fetch_json;
use crate::page::RegistryPage;
use crate::transport::HttpTransport;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Pockets never used for pinning.
pub const UNSTABLE_POCKETS: &[&str] = &["Proposed", "Backports"];

/// A release line of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeriesInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub active: bool,
}

/// One publication of a binary package in the primary archive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BinaryPublication {
    #[serde(default)]
    pub binary_package_name: String,
    pub binary_package_version: String,
    #[serde(default)]
    pub date_published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pocket: String,
    #[serde(default)]
    pub distro_arch_series_link: String,
}

impl BinaryPublication {
    /// True when the arch-series link points at `<distro>/<series>/<arch>`.
    pub fn targets(&self, distro: &str, series: &str) -> bool {
        let segments: Vec<&str> = self
            .distro_arch_series_link
            .trim_end_matches('/')
            .rsplit('/')
            .take(3)
            .collect();
        matches!(segments.as_slice(), [_, s, d] if *s == series && *d == distro)
    }

    pub fn is_unstable_pocket(&self) -> bool {
        UNSTABLE_POCKETS.contains(&self.pocket.as_str())
    }

    pub fn published_on(&self) -> Option<NaiveDate> {
        self.date_published.map(|t| t.date_naive())
    }
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    entries: Vec<T>,
    #[serde(default)]
    total_size: Option<u64>,
    #[serde(default)]
    next_collection_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesResource {
    #[serde(default)]
    active: bool,
}

/// Reader for `/<distro>/series` and `/<distro>/<series>`.
pub struct SeriesClient<'a> {
    transport: &'a dyn HttpTransport,
    config: ResolverConfig,
}

impl<'a> SeriesClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &ResolverConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }

    pub fn series_url(&self, distro: &str) -> String {
        format!("{}/{}/series", self.config.launchpad_base(), distro)
    }

    pub fn fetch_page(&self, url: &str) -> Result<RegistryPage<SeriesInfo>, RegistryError> {
        let payload: Collection<SeriesInfo> = fetch_json(self.transport, url, &self.config.retry)?;
        let total = payload.total_size.unwrap_or(payload.entries.len() as u64);
        Ok(RegistryPage {
            results: payload.entries,
            total,
            next: payload.next_collection_link,
        })
    }

    /// Every series of `distro`, following pagination.
    pub fn list(&self, distro: &str) -> Result<Vec<SeriesInfo>, RegistryError> {
        let mut out = Vec::new();
        let mut url = Some(self.series_url(distro));
        let mut first = true;
        while let Some(current) = url {
            if !first {
                pace(self.config.archive_page_delay());
            }
            first = false;
            let page = self.fetch_page(&current)?;
            out.extend(page.results);
            url = page.next;
        }
        Ok(out)
    }

    /// Whether the archive for `distro/series` still accepts installs.
    pub fn is_active(&self, distro: &str, series: &str) -> Result<bool, RegistryError> {
        let url = format!("{}/{}/{}", self.config.launchpad_base(), distro, series);
        let resource: SeriesResource = fetch_json(self.transport, &url, &self.config.retry)?;
        Ok(resource.active)
    }
}

/// Reader for `getPublishedBinaries` on a distribution's primary archive.
///
/// Pagination is offset based (`ws.start`/`ws.size`). The server's
/// `next_collection_link` is used when present; otherwise the next offset is
/// derived from `total_size`.
pub struct ArchiveClient<'a> {
    transport: &'a dyn HttpTransport,
    config: ResolverConfig,
}

impl<'a> ArchiveClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &ResolverConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }

    pub fn first_page_url(&self, distro: &str, binary_name: &str) -> Result<String, RegistryError> {
        let base = format!("{}/{}/+archive/primary", self.config.launchpad_base(), distro);
        let mut url = Url::parse(&base).map_err(|e| RegistryError::Decode {
            url: base.clone(),
            message: e.to_string(),
        })?;
        url.query_pairs_mut()
            .append_pair("ws.op", "getPublishedBinaries")
            .append_pair("binary_name", binary_name)
            .append_pair("status", "Published")
            .append_pair("exact_match", "true")
            .append_pair("order_by_date", "true")
            .append_pair("ws.start", "0")
            .append_pair("ws.size", &self.config.archive_page_size.to_string());
        Ok(url.to_string())
    }

    pub fn fetch_page(&self, url: &str) -> Result<RegistryPage<BinaryPublication>, RegistryError> {
        let payload: Collection<BinaryPublication> = fetch_json(self.transport, url, &self.config.retry)?;
        let total = payload.total_size.unwrap_or(payload.entries.len() as u64);

        let next = match payload.next_collection_link {
            Some(link) => Some(link),
            None => self.derived_next(url, total)?,
        };
        debug!(url, total, entries = payload.entries.len(), has_next = next.is_some(), "archive page");

        Ok(RegistryPage {
            results: payload.entries,
            total,
            next,
        })
    }

    pub fn page_delay(&self) -> std::time::Duration {
        self.config.archive_page_delay()
    }

    fn derived_next(&self, url: &str, total: u64) -> Result<Option<String>, RegistryError> {
        let parsed = Url::parse(url).map_err(|e| RegistryError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let param = |name: &str| -> Option<u64> {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.parse().ok())
        };
        let start = param("ws.start").unwrap_or(0);
        let size = param("ws.size").unwrap_or(u64::from(self.config.archive_page_size)).max(1);

        if start + size >= total {
            return Ok(None);
        }

        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| {
                if k == "ws.start" {
                    (k.into_owned(), (start + size).to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        let mut next = parsed.clone();
        next.query_pairs_mut().clear().extend_pairs(pairs);
        Ok(Some(next.to_string()))
    }
}
