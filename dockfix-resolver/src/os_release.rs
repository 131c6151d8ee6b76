use dockfix_edit::text::dequote;
use std::collections::BTreeMap;

/// Distributions whose package archive can be queried.
pub const KNOWN_DISTROS: &[&str] = &["ubuntu"];

pub fn is_known_distro(name: &str) -> bool {
    KNOWN_DISTROS.iter().any(|d| d.eq_ignore_ascii_case(name))
}

/// The identifying fields of `/etc/os-release`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
}

impl OsRelease {
    pub fn parse(text: &str) -> Self {
        let fields: BTreeMap<&str, &str> = text
            .lines()
            .filter_map(|l| l.split_once('='))
            .map(|(k, v)| (k.trim(), dequote(v.trim())))
            .collect();
        Self {
            id: fields.get("ID").copied().unwrap_or_default().to_string(),
            version_id: fields.get("VERSION_ID").copied().unwrap_or_default().to_string(),
        }
    }
}
