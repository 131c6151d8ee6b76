use std::fmt;

/// Precision of a package pin, from exact to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardLevel {
    /// `2.13.4-1ubuntu1`
    Full,
    /// `2.13.*`
    Patch,
    /// `2.*`
    Minor,
    /// `1:*`, only for versions that carry an epoch.
    Major,
}

impl WildcardLevel {
    pub const ALL: [WildcardLevel; 4] = [
        WildcardLevel::Full,
        WildcardLevel::Patch,
        WildcardLevel::Minor,
        WildcardLevel::Major,
    ];

    /// The version pattern at this precision, if it exists.
    pub fn apply(self, version: &str) -> Option<String> {
        match self {
            WildcardLevel::Full => Some(version.to_string()),
            WildcardLevel::Patch => keep_components(version, 2),
            WildcardLevel::Minor => keep_components(version, 1),
            WildcardLevel::Major => version
                .split_once(':')
                .filter(|(epoch, _)| !epoch.is_empty() && epoch.chars().all(|c| c.is_ascii_digit()))
                .map(|(epoch, _)| format!("{epoch}:*")),
        }
    }
}

impl fmt::Display for WildcardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WildcardLevel::Full => "full",
            WildcardLevel::Patch => "patch",
            WildcardLevel::Minor => "minor",
            WildcardLevel::Major => "major",
        };
        f.write_str(s)
    }
}

/// Keeps `keep` components and replaces the rest with `*`.
///
/// Separators are `.`, `-`, `+`, and `:` once a component has been seen.
fn keep_components(version: &str, keep: usize) -> Option<String> {
    let mut seen = 0;
    for (i, c) in version.char_indices() {
        let separator = matches!(c, '.' | '-' | '+') || (c == ':' && seen != 0);
        if separator {
            seen += 1;
            if seen == keep {
                return Some(format!("{}*", &version[..=i]));
            }
        }
    }
    None
}

/// Distinct candidate versions in decreasing precision.
pub fn candidates(version: &str) -> Vec<(WildcardLevel, String)> {
    let mut out: Vec<(WildcardLevel, String)> = Vec::new();
    for level in WildcardLevel::ALL {
        if let Some(v) = level.apply(version)
            && !out.iter().any(|(_, seen)| *seen == v)
        {
            out.push((level, v));
        }
    }
    out
}
