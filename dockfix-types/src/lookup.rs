use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer of a single registry-backed lookup.
///
/// Absence is an ordinary answer, not an error: callers must handle
/// `NotFound` and `Unavailable` explicitly and carry on with the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    /// The registry answered and has no data for the question (404 or empty result).
    NotFound,
    /// The registry could not be reached after retries were exhausted.
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn as_ref(&self) -> Lookup<&T> {
        match self {
            Lookup::Found(v) => Lookup::Found(v),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Unavailable(reason) => Lookup::Unavailable(reason.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(v) => Lookup::Found(f(v)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Unavailable(reason) => Lookup::Unavailable(reason),
        }
    }

    /// Chains a dependent lookup, short-circuiting on absence.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Lookup<U>) -> Lookup<U> {
        match self {
            Lookup::Found(v) => f(v),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Unavailable(reason) => Lookup::Unavailable(reason),
        }
    }

    /// Falls back to `f` only when the registry had no data.
    pub fn or_else_not_found(self, f: impl FnOnce() -> Lookup<T>) -> Lookup<T> {
        match self {
            Lookup::NotFound => f(),
            other => other,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// A distribution together with the release line backing an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistroSeries {
    pub distro: String,
    pub series: String,
}

impl DistroSeries {
    pub fn new(distro: impl Into<String>, series: impl Into<String>) -> Self {
        Self {
            distro: distro.into(),
            series: series.into(),
        }
    }
}

impl fmt::Display for DistroSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.distro, self.series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_then_short_circuits_absence() {
        let missing: Lookup<u32> = Lookup::NotFound;
        assert_eq!(missing.and_then(|v| Lookup::Found(v + 1)), Lookup::NotFound);

        let down: Lookup<u32> = Lookup::Unavailable("503".into());
        assert_eq!(
            down.and_then(|v| Lookup::Found(v + 1)),
            Lookup::Unavailable("503".into())
        );

        assert_eq!(Lookup::Found(1).and_then(|v| Lookup::Found(v + 1)), Lookup::Found(2));
    }

    #[test]
    fn fallback_only_applies_to_not_found() {
        let down: Lookup<&str> = Lookup::Unavailable("timeout".into());
        assert_eq!(
            down.or_else_not_found(|| Lookup::Found("x")),
            Lookup::Unavailable("timeout".into())
        );
        assert_eq!(
            Lookup::NotFound.or_else_not_found(|| Lookup::Found("x")),
            Lookup::Found("x")
        );
    }

    #[test]
    fn distro_series_display() {
        assert_eq!(DistroSeries::new("ubuntu", "focal").to_string(), "ubuntu/focal");
    }
}
