use dockfix_registry::image_path;

/// `name[:tag][@digest]` as written after `FROM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    pub fn parse(reference: &str) -> Self {
        let (rest, digest) = match reference.split_once('@') {
            Some((r, d)) => (r, Some(d.to_string())),
            None => (reference, None),
        };
        // A colon before the last slash belongs to a registry port.
        let slash = rest.rfind('/');
        match rest.rfind(':') {
            Some(colon) if slash.is_none_or(|s| colon > s) => Self {
                name: rest[..colon].to_string(),
                tag: Some(rest[colon + 1..].to_string()),
                digest,
            },
            _ => Self {
                name: rest.to_string(),
                tag: None,
                digest,
            },
        }
    }

    /// True when the reference fixes a version by tag or digest.
    pub fn is_pinned(&self) -> bool {
        self.tag.is_some() || self.digest.is_some()
    }

    pub fn tag_or_latest(&self) -> &str {
        self.tag.as_deref().unwrap_or("latest")
    }

    /// Official Docker Hub image (implicit `library/` owner).
    pub fn is_official(&self) -> bool {
        image_path(&self.name).starts_with("library/")
    }

    /// Repository name without owner or registry.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn with_tag(&self, tag: &str) -> String {
        format!("{}:{}", self.name, tag)
    }
}
