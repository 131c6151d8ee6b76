use crate::image::ImageRef;
use crate::os_release::{OsRelease, is_known_distro};
use crate::ports::{Probe, ProbeError, ProbeStep};
use crate::wildcard::{WildcardLevel, candidates};
use chrono::NaiveDate;
use dockfix_registry::{
    ArchiveClient, HttpTransport, ImageTag, ImageTagClient, RegistryError, ResolverConfig, SeriesClient, pace,
};
use dockfix_types::{DistroSeries, Lookup};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::{debug, info};

/// Platform whose digests identify what `latest` points to.
const LATEST_ARCH: &str = "amd64";
const LATEST_OS: &str = "linux";

/// Why a package could not be pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinFailure {
    UnknownDistro,
    RegistryUnavailable(String),
    VersionNotFound,
    ProbeRejected,
    ProbeUnavailable(String),
}

impl fmt::Display for PinFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinFailure::UnknownDistro => f.write_str("base image distribution is not supported"),
            PinFailure::RegistryUnavailable(reason) => write!(f, "registry unavailable: {reason}"),
            PinFailure::VersionNotFound => f.write_str("no published version before the reference date"),
            PinFailure::ProbeRejected => f.write_str("no pin variant installs in the base image"),
            PinFailure::ProbeUnavailable(reason) => write!(f, "probe unavailable: {reason}"),
        }
    }
}

/// Result of graduated pinning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinOutcome {
    /// `reference` is `package=<version or pattern>` and installed in the probe.
    Pinned { reference: String, level: WildcardLevel },
    /// The package stays as written.
    Unpinned { reference: String, reason: PinFailure },
}

impl PinOutcome {
    pub fn reference(&self) -> &str {
        match self {
            PinOutcome::Pinned { reference, .. } | PinOutcome::Unpinned { reference, .. } => reference,
        }
    }
}

/// Version knowledge consumed by repair strategies.
pub trait Resolve {
    /// Concrete tag currently sharing a digest with `latest`.
    fn latest_tag(&self, image: &str) -> Lookup<String>;

    /// Most recently pushed tag on or before `as_of`.
    fn tag_as_of(&self, image: &str, as_of: NaiveDate) -> Lookup<String>;

    /// Distribution and series backing `image`.
    fn distro_series(&self, image: &str) -> Lookup<DistroSeries>;

    /// Whether the package archive for `target` is still served.
    fn archive_active(&self, target: &DistroSeries) -> Lookup<bool>;

    /// Newest stable version of `package` published before `as_of`.
    fn pinned_version(&self, target: &DistroSeries, package: &str, as_of: NaiveDate) -> Lookup<String>;

    /// Tries exact then wildcarded pins until one installs in `image`.
    fn graduated_pin(&self, image: &str, package: &str, as_of: NaiveDate) -> PinOutcome;

    /// Whether `shell` exists in `image`.
    fn shell_available(&self, image: &str, shell: &str) -> Lookup<bool>;
}

/// Registry- and probe-backed [`Resolve`] implementation.
///
/// Distribution answers are memoized for the lifetime of the resolver. Every
/// other lookup goes to the registry.
pub struct VersionResolver<'a> {
    tags: ImageTagClient<'a>,
    series: SeriesClient<'a>,
    archive: ArchiveClient<'a>,
    probe: &'a dyn Probe,
    distros: RefCell<HashMap<String, Lookup<DistroSeries>>>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(transport: &'a dyn HttpTransport, probe: &'a dyn Probe, config: &ResolverConfig) -> Self {
        Self {
            tags: ImageTagClient::new(transport, config),
            series: SeriesClient::new(transport, config),
            archive: ArchiveClient::new(transport, config),
            probe,
            distros: RefCell::new(HashMap::new()),
        }
    }

    /// Series of `distro` matching an image tag (`20.04`, `focal`, `latest`).
    pub fn resolve_series(&self, distro: &str, tag: &str) -> Lookup<String> {
        let all = match self.series.list(distro) {
            Ok(all) => all,
            Err(e) => return absent(e),
        };
        if all.is_empty() {
            return Lookup::NotFound;
        }

        let tag = if tag == "latest" {
            match self.latest_tag(distro) {
                Lookup::Found(t) => t,
                Lookup::NotFound => return Lookup::NotFound,
                Lookup::Unavailable(reason) => return Lookup::Unavailable(reason),
            }
        } else {
            tag.to_string()
        };
        let tag = tag.split('-').next().unwrap_or_default();
        if tag.is_empty() {
            return Lookup::NotFound;
        }

        all.into_iter()
            .find(|s| {
                s.name == tag || (!s.version.is_empty() && (tag.contains(&s.version) || s.version.contains(tag)))
            })
            .map(|s| s.name)
            .into()
    }

    fn detect_distro(&self, image: &str) -> Lookup<DistroSeries> {
        let reference = ImageRef::parse(image);
        let named = reference.is_official() && is_known_distro(reference.short_name());
        if named && reference.digest.is_none() {
            let distro = reference.short_name().to_ascii_lowercase();
            return self
                .resolve_series(&distro, reference.tag_or_latest())
                .map(|series| DistroSeries::new(distro, series));
        }

        match self.probe.os_release(image) {
            Ok(text) => {
                let os = OsRelease::parse(&text);
                debug!(image, id = %os.id, version = %os.version_id, "os-release");
                if !is_known_distro(&os.id) || os.version_id.is_empty() {
                    return Lookup::NotFound;
                }
                let distro = os.id.to_ascii_lowercase();
                self.resolve_series(&distro, &os.version_id)
                    .map(|series| DistroSeries::new(distro, series))
            }
            Err(ProbeError::Rejected { .. }) => Lookup::NotFound,
            Err(ProbeError::Unavailable { message }) => Lookup::Unavailable(message),
        }
    }

    /// Walks tag pages, calling `visit` on each tag until it returns `Some`.
    fn scan_tags<T>(&self, image: &str, mut visit: impl FnMut(&ImageTag) -> Option<T>) -> Result<Option<T>, RegistryError> {
        let mut url = Some(self.tags.first_page_url(image));
        let mut first = true;
        while let Some(current) = url {
            if !first {
                pace(self.tags.page_delay());
            }
            first = false;
            let page = self.tags.fetch_page(&current)?;
            if let Some(hit) = page.results.iter().find_map(&mut visit) {
                return Ok(Some(hit));
            }
            url = page.next;
        }
        Ok(None)
    }

    fn find_latest(&self, image: &str) -> Result<Option<String>, RegistryError> {
        let mut seen: Vec<ImageTag> = Vec::new();
        let mut digests: Option<BTreeSet<String>> = None;
        let mut alternative: Option<String> = None;

        // Tags that share a digest with `latest` may come before or after it.
        let found = self.scan_tags(image, |tag| match &digests {
            Some(latest) => pick_from(std::iter::once(tag), latest, &mut alternative),
            None if tag.name == "latest" => {
                let d: BTreeSet<String> = tag.digests_for(LATEST_ARCH, LATEST_OS).map(str::to_string).collect();
                let hit = pick_from(seen.iter(), &d, &mut alternative);
                digests = Some(d);
                hit
            }
            None => {
                seen.push(tag.clone());
                None
            }
        })?;

        Ok(found.or(alternative))
    }

    fn find_tag_as_of(&self, image: &str, as_of: NaiveDate) -> Result<Option<String>, RegistryError> {
        self.scan_tags(image, |tag| {
            (tag.name != "latest" && tag.pushed_on().is_some_and(|d| d < as_of)).then(|| tag.name.clone())
        })
    }

    fn find_pinned_version(&self, target: &DistroSeries, package: &str, as_of: NaiveDate) -> Result<Option<String>, RegistryError> {
        let mut url = Some(self.archive.first_page_url(&target.distro, package)?);
        let mut first = true;
        while let Some(current) = url {
            if !first {
                pace(self.archive.page_delay());
            }
            first = false;
            let page = self.archive.fetch_page(&current)?;
            let hit = page.results.iter().find(|p| {
                p.targets(&target.distro, &target.series)
                    && !p.is_unstable_pocket()
                    && p.published_on().is_some_and(|d| d < as_of)
            });
            if let Some(p) = hit {
                return Ok(Some(p.binary_package_version.clone()));
            }
            url = page.next;
        }
        Ok(None)
    }
}

/// First candidate sharing a `latest` digest whose name starts with a digit.
///
/// Non-numeric matches are remembered in `alternative`, the last one wins.
fn pick_from<'t>(
    tags: impl Iterator<Item = &'t ImageTag>,
    digests: &BTreeSet<String>,
    alternative: &mut Option<String>,
) -> Option<String> {
    for tag in tags {
        if tag.name == "latest" || !tag.has_digest_in(digests) {
            continue;
        }
        if tag.name.starts_with(|c: char| c.is_ascii_digit()) {
            return Some(tag.name.clone());
        }
        *alternative = Some(tag.name.clone());
    }
    None
}

fn absent<T>(error: RegistryError) -> Lookup<T> {
    if error.is_not_found() {
        Lookup::NotFound
    } else {
        Lookup::Unavailable(error.to_string())
    }
}

fn lookup<T>(result: Result<Option<T>, RegistryError>) -> Lookup<T> {
    match result {
        Ok(value) => value.into(),
        Err(e) => absent(e),
    }
}

impl Resolve for VersionResolver<'_> {
    fn latest_tag(&self, image: &str) -> Lookup<String> {
        let answer = lookup(self.find_latest(image));
        debug!(image, ?answer, "latest tag");
        answer
    }

    fn tag_as_of(&self, image: &str, as_of: NaiveDate) -> Lookup<String> {
        lookup(self.find_tag_as_of(image, as_of))
    }

    fn distro_series(&self, image: &str) -> Lookup<DistroSeries> {
        if let Some(hit) = self.distros.borrow().get(image) {
            return hit.clone();
        }
        let answer = self.detect_distro(image);
        if !matches!(answer, Lookup::Unavailable(_)) {
            self.distros.borrow_mut().insert(image.to_string(), answer.clone());
        }
        answer
    }

    fn archive_active(&self, target: &DistroSeries) -> Lookup<bool> {
        match self.series.is_active(&target.distro, &target.series) {
            Ok(active) => Lookup::Found(active),
            Err(e) => absent(e),
        }
    }

    fn pinned_version(&self, target: &DistroSeries, package: &str, as_of: NaiveDate) -> Lookup<String> {
        lookup(self.find_pinned_version(target, package, as_of))
    }

    fn graduated_pin(&self, image: &str, package: &str, as_of: NaiveDate) -> PinOutcome {
        let unpinned = |reason| PinOutcome::Unpinned {
            reference: package.to_string(),
            reason,
        };

        let target = match self.distro_series(image) {
            Lookup::Found(t) => t,
            Lookup::NotFound => return unpinned(PinFailure::UnknownDistro),
            Lookup::Unavailable(reason) => return unpinned(PinFailure::RegistryUnavailable(reason)),
        };
        match self.archive_active(&target) {
            Lookup::Found(true) => {}
            Lookup::Found(false) | Lookup::NotFound => return unpinned(PinFailure::UnknownDistro),
            Lookup::Unavailable(reason) => return unpinned(PinFailure::RegistryUnavailable(reason)),
        }
        let version = match self.pinned_version(&target, package, as_of) {
            Lookup::Found(v) => v,
            Lookup::NotFound => return unpinned(PinFailure::VersionNotFound),
            Lookup::Unavailable(reason) => return unpinned(PinFailure::RegistryUnavailable(reason)),
        };

        for (level, candidate) in candidates(&version) {
            let reference = format!("{package}={candidate}");
            match self.probe.check(image, ProbeStep::Install(&reference)) {
                Ok(()) => {
                    info!(image, %reference, %level, "pinned package");
                    return PinOutcome::Pinned { reference, level };
                }
                Err(ProbeError::Rejected { message }) => {
                    debug!(image, %reference, %message, "pin rejected");
                }
                Err(ProbeError::Unavailable { message }) => {
                    return unpinned(PinFailure::ProbeUnavailable(message));
                }
            }
        }
        unpinned(PinFailure::ProbeRejected)
    }

    fn shell_available(&self, image: &str, shell: &str) -> Lookup<bool> {
        match self.probe.check(image, ProbeStep::Shell(shell)) {
            Ok(()) => Lookup::Found(true),
            Err(ProbeError::Rejected { .. }) => Lookup::Found(false),
            Err(ProbeError::Unavailable { message }) => Lookup::Unavailable(message),
        }
    }
}

/// A [`Resolve`] that knows nothing: every lookup is `NotFound`.
///
/// Used when registry access is disabled; registry-backed repairs then
/// report themselves as skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineResolver;

impl Resolve for OfflineResolver {
    fn latest_tag(&self, _image: &str) -> Lookup<String> {
        Lookup::NotFound
    }

    fn tag_as_of(&self, _image: &str, _as_of: NaiveDate) -> Lookup<String> {
        Lookup::NotFound
    }

    fn distro_series(&self, _image: &str) -> Lookup<DistroSeries> {
        Lookup::NotFound
    }

    fn archive_active(&self, _target: &DistroSeries) -> Lookup<bool> {
        Lookup::NotFound
    }

    fn pinned_version(&self, _target: &DistroSeries, _package: &str, _as_of: NaiveDate) -> Lookup<String> {
        Lookup::NotFound
    }

    fn graduated_pin(&self, _image: &str, package: &str, _as_of: NaiveDate) -> PinOutcome {
        PinOutcome::Unpinned {
            reference: package.to_string(),
            reason: PinFailure::UnknownDistro,
        }
    }

    fn shell_available(&self, _image: &str, _shell: &str) -> Lookup<bool> {
        Lookup::NotFound
    }
}
