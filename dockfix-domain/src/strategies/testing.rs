use chrono::NaiveDate;
use dockfix_edit::Dockerfile;
use dockfix_resolver::{PinFailure, PinOutcome, Resolve, WildcardLevel};
use dockfix_types::{DistroSeries, Lookup};

pub(crate) fn doc(src: &str) -> Dockerfile {
    Dockerfile::from_contents(
        "Dockerfile",
        src,
        NaiveDate::from_ymd_opt(2022, 6, 1).unwrap(),
    )
    .unwrap()
}

/// Resolver answering from fixed tables.
#[derive(Default)]
pub(crate) struct StubResolver {
    pub latest: Option<&'static str>,
    pub as_of: Option<&'static str>,
    pub shells: Vec<&'static str>,
    pub pins: Vec<(&'static str, &'static str)>,
    pub unknown_distro: bool,
}

impl Resolve for StubResolver {
    fn latest_tag(&self, _image: &str) -> Lookup<String> {
        self.latest.map(str::to_string).into()
    }

    fn tag_as_of(&self, _image: &str, _as_of: NaiveDate) -> Lookup<String> {
        self.as_of.map(str::to_string).into()
    }

    fn distro_series(&self, _image: &str) -> Lookup<DistroSeries> {
        if self.unknown_distro {
            Lookup::NotFound
        } else {
            Lookup::Found(DistroSeries::new("ubuntu", "focal"))
        }
    }

    fn archive_active(&self, _target: &DistroSeries) -> Lookup<bool> {
        Lookup::Found(true)
    }

    fn pinned_version(&self, _target: &DistroSeries, package: &str, _as_of: NaiveDate) -> Lookup<String> {
        self.pins
            .iter()
            .find(|(p, _)| *p == package)
            .map(|(_, v)| v.to_string())
            .into()
    }

    fn graduated_pin(&self, _image: &str, package: &str, _as_of: NaiveDate) -> PinOutcome {
        if self.unknown_distro {
            return PinOutcome::Unpinned {
                reference: package.to_string(),
                reason: PinFailure::UnknownDistro,
            };
        }
        match self.pins.iter().find(|(p, _)| *p == package) {
            Some((_, v)) => PinOutcome::Pinned {
                reference: format!("{package}={v}"),
                level: WildcardLevel::Full,
            },
            None => PinOutcome::Unpinned {
                reference: package.to_string(),
                reason: PinFailure::VersionNotFound,
            },
        }
    }

    fn shell_available(&self, _image: &str, shell: &str) -> Lookup<bool> {
        Lookup::Found(self.shells.contains(&shell))
    }
}
