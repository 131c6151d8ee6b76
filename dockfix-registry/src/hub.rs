use crate::config::ResolverConfig;
use crate::error::RegistryError;
use crate::fetch::fetch_json;
use crate::page::RegistryPage;
use crate::transport::HttpTransport;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

/// One tag of a Docker Hub repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageTag {
    pub name: String,

    #[serde(default)]
    pub tag_last_pushed: Option<DateTime<Utc>>,

    #[serde(default)]
    pub images: Vec<ImageVariant>,
}

/// Platform-specific manifest behind a tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageVariant {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub digest: String,
}

impl ImageTag {
    /// Digests of the variants built for `architecture`/`os`.
    pub fn digests_for<'a>(&'a self, architecture: &'a str, os: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.images
            .iter()
            .filter(move |v| v.architecture == architecture && v.os == os && !v.digest.is_empty())
            .map(|v| v.digest.as_str())
    }

    pub fn has_digest_in(&self, digests: &std::collections::BTreeSet<String>) -> bool {
        self.images.iter().any(|v| digests.contains(&v.digest))
    }

    pub fn pushed_on(&self) -> Option<NaiveDate> {
        self.tag_last_pushed.map(|t| t.date_naive())
    }
}

#[derive(Debug, Deserialize)]
struct TagsPayload {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<ImageTag>,
}

/// `owner/name` path of an image on Docker Hub.
///
/// `docker.io/` is dropped, official images get the implicit `library/` owner,
/// and only the last two path segments are kept.
pub fn image_path(image: &str) -> String {
    let image = image
        .strip_prefix("docker.io/")
        .or_else(|| image.strip_prefix("index.docker.io/"))
        .unwrap_or(image);
    if !image.contains('/') {
        return format!("library/{image}");
    }
    let segments: Vec<&str> = image.split('/').collect();
    segments[segments.len().saturating_sub(2)..].join("/")
}

/// Reader for `/v2/repositories/<owner>/<name>/tags/`, most recently updated first.
pub struct ImageTagClient<'a> {
    transport: &'a dyn HttpTransport,
    config: ResolverConfig,
}

impl<'a> ImageTagClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &ResolverConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }

    pub fn first_page_url(&self, image: &str) -> String {
        format!(
            "{}/v2/repositories/{}/tags/?page_size={}&page=1&ordering=last_updated",
            self.config.hub_base(),
            image_path(image),
            self.config.tag_page_size
        )
    }

    pub fn fetch_page(&self, url: &str) -> Result<RegistryPage<ImageTag>, RegistryError> {
        let payload: TagsPayload = fetch_json(self.transport, url, &self.config.retry)?;
        Ok(RegistryPage {
            results: payload.results,
            total: payload.count,
            next: payload.next.filter(|n| !n.is_empty()),
        })
    }

    pub fn page_delay(&self) -> std::time::Duration {
        self.config.tag_page_delay()
    }
}
