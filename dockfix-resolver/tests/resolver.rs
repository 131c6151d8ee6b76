//! Resolver behavior against in-memory registries and a scripted probe.

use chrono::NaiveDate;
use dockfix_registry::{HttpResponse, MemoryTransport, ResolverConfig};
use dockfix_resolver::{
    PinFailure, PinOutcome, Probe, ProbeError, ProbeStep, Resolve, VersionResolver, WildcardLevel,
};
use dockfix_types::{DistroSeries, Lookup};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::cell::RefCell;
use std::collections::HashMap;

const HUB: &str = "https://hub.test";
const LP: &str = "https://lp.test/1.0";

fn config() -> ResolverConfig {
    ResolverConfig {
        hub_url: HUB.into(),
        launchpad_url: LP.into(),
        tag_page_size: 2,
        archive_page_size: 2,
        retry: dockfix_types::retry::RetryPolicy::immediate(1),
        ..ResolverConfig::default()
    }
    .without_delays()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn tags_url(image: &str, page: usize) -> String {
    if page == 1 {
        format!("{HUB}/v2/repositories/library/{image}/tags/?page_size=2&page=1&ordering=last_updated")
    } else {
        format!("{HUB}/tags/{image}/{page}")
    }
}

/// Splits `(name, digest, pushed)` tags into hub pages of two.
fn hub_routes(image: &str, tags: &[(&str, &str, &str)]) -> Vec<(String, HttpResponse)> {
    let pages: Vec<_> = tags.chunks(2).collect();
    pages
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let results: Vec<_> = chunk
                .iter()
                .map(|(name, digest, pushed)| {
                    json!({
                        "name": name,
                        "tag_last_pushed": format!("{pushed}T12:00:00Z"),
                        "images": [{"architecture": "amd64", "os": "linux", "digest": digest}],
                    })
                })
                .collect();
            let next = (i + 1 < pages.len()).then(|| tags_url(image, i + 2));
            let body = json!({"count": tags.len(), "next": next, "results": results});
            (tags_url(image, i + 1), HttpResponse::ok(body.to_string()))
        })
        .collect()
}

fn series_routes() -> Vec<(String, HttpResponse)> {
    vec![
        (
            format!("{LP}/ubuntu/series"),
            HttpResponse::ok(
                json!({"total_size": 3, "entries": [
                    {"name": "jammy", "version": "22.04", "active": true},
                    {"name": "focal", "version": "20.04", "active": true},
                    {"name": "trusty", "version": "14.04", "active": false},
                ]})
                .to_string(),
            ),
        ),
        (
            format!("{LP}/ubuntu/focal"),
            HttpResponse::ok(json!({"name": "focal", "active": true}).to_string()),
        ),
        (
            format!("{LP}/ubuntu/trusty"),
            HttpResponse::ok(json!({"name": "trusty", "active": false}).to_string()),
        ),
    ]
}

fn publication(version: &str, series: &str, pocket: &str, published: &str) -> serde_json::Value {
    json!({
        "binary_package_name": "curl",
        "binary_package_version": version,
        "date_published": format!("{published}T00:00:00Z"),
        "pocket": pocket,
        "distro_arch_series_link": format!("{LP}/ubuntu/{series}/amd64"),
    })
}

/// Archive pages served by offset, `size` entries each.
fn archive_transport(entries: Vec<serde_json::Value>, extra: Vec<(String, HttpResponse)>) -> MemoryTransport {
    let table: HashMap<String, HttpResponse> = extra.into_iter().collect();
    MemoryTransport::new(move |url| {
        if let Some(r) = table.get(url) {
            return Ok(r.clone());
        }
        if url.contains("getPublishedBinaries") {
            let start: usize = url::Url::parse(url)
                .unwrap()
                .query_pairs()
                .find(|(k, _)| k == "ws.start")
                .map(|(_, v)| v.parse().unwrap())
                .unwrap();
            let page: Vec<_> = entries.iter().skip(start).take(2).cloned().collect();
            let body = json!({"total_size": entries.len(), "entries": page});
            return Ok(HttpResponse::ok(body.to_string()));
        }
        Ok(HttpResponse::status(404))
    })
}

#[derive(Default)]
struct ScriptedProbe {
    accepted: Vec<String>,
    os_release: Option<String>,
    calls: RefCell<Vec<String>>,
}

impl Probe for ScriptedProbe {
    fn check(&self, _image: &str, step: ProbeStep<'_>) -> Result<(), ProbeError> {
        let what = match step {
            ProbeStep::Shell(s) | ProbeStep::Install(s) => s.to_string(),
        };
        self.calls.borrow_mut().push(what.clone());
        if self.accepted.contains(&what) {
            Ok(())
        } else {
            Err(ProbeError::Rejected { message: format!("{what} failed") })
        }
    }

    fn os_release(&self, _image: &str) -> Result<String, ProbeError> {
        self.os_release.clone().ok_or(ProbeError::Rejected {
            message: "no /etc/os-release".into(),
        })
    }
}

#[test]
fn latest_prefers_numeric_tag_sharing_its_digest() {
    let t = MemoryTransport::routes(hub_routes(
        "nginx",
        &[
            ("stable", "sha256:aaa", "2024-03-01"),
            ("latest", "sha256:aaa", "2024-03-01"),
            ("mainline", "sha256:bbb", "2024-02-01"),
            ("2.4.1", "sha256:aaa", "2024-03-01"),
        ],
    ));
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.latest_tag("nginx"), Lookup::Found("2.4.1".to_string()));
}

#[test]
fn latest_falls_back_to_non_numeric_alias() {
    let t = MemoryTransport::routes(hub_routes(
        "nginx",
        &[
            ("latest", "sha256:aaa", "2024-03-01"),
            ("stable", "sha256:aaa", "2024-03-01"),
            ("1.0", "sha256:old", "2020-01-01"),
        ],
    ));
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.latest_tag("nginx"), Lookup::Found("stable".to_string()));
}

#[test]
fn unknown_image_is_not_found_and_outage_is_unavailable() {
    let t = MemoryTransport::routes(vec![]);
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.latest_tag("nope"), Lookup::NotFound);

    let down = MemoryTransport::new(|_| Ok(HttpResponse::status(503)));
    let r = VersionResolver::new(&down, &probe, &config());
    assert!(matches!(r.latest_tag("nginx"), Lookup::Unavailable(_)));
}

#[test]
fn tag_as_of_skips_tags_pushed_later() {
    let t = MemoryTransport::routes(hub_routes(
        "node",
        &[
            ("latest", "sha256:a", "2024-05-01"),
            ("22", "sha256:a", "2024-05-01"),
            ("20", "sha256:b", "2023-04-18"),
            ("18", "sha256:c", "2022-04-19"),
        ],
    ));
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.tag_as_of("node", date(2023, 6, 1)), Lookup::Found("20".to_string()));
    assert_eq!(r.tag_as_of("node", date(2020, 1, 1)), Lookup::NotFound);
}

#[test]
fn series_matches_version_name_and_suffixed_tags() {
    let t = MemoryTransport::routes(series_routes());
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.resolve_series("ubuntu", "20.04"), Lookup::Found("focal".to_string()));
    assert_eq!(r.resolve_series("ubuntu", "focal"), Lookup::Found("focal".to_string()));
    assert_eq!(r.resolve_series("ubuntu", "22.04-slim"), Lookup::Found("jammy".to_string()));
    assert_eq!(r.resolve_series("ubuntu", "warty"), Lookup::NotFound);
}

#[test]
fn distro_of_custom_image_comes_from_os_release_and_is_memoized() {
    let t = MemoryTransport::routes(series_routes());
    let probe = ScriptedProbe {
        os_release: Some("ID=ubuntu\nVERSION_ID=\"20.04\"\n".into()),
        ..ScriptedProbe::default()
    };
    let r = VersionResolver::new(&t, &probe, &config());
    let expected = Lookup::Found(DistroSeries::new("ubuntu", "focal"));
    assert_eq!(r.distro_series("acme/app:1.2"), expected);
    let requests = t.request_count();
    assert_eq!(r.distro_series("acme/app:1.2"), expected);
    assert_eq!(t.request_count(), requests);
}

#[test]
fn non_ubuntu_image_has_unknown_distro() {
    let t = MemoryTransport::routes(series_routes());
    let probe = ScriptedProbe {
        os_release: Some("ID=alpine\nVERSION_ID=3.19.1\n".into()),
        ..ScriptedProbe::default()
    };
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.distro_series("alpine:3.19"), Lookup::NotFound);
    assert_eq!(
        r.graduated_pin("alpine:3.19", "curl", date(2024, 1, 1)),
        PinOutcome::Unpinned {
            reference: "curl".into(),
            reason: PinFailure::UnknownDistro
        }
    );
}

#[test]
fn pinned_version_skips_other_series_and_unstable_pockets() {
    let t = archive_transport(
        vec![
            publication("7.81.0-1", "jammy", "Updates", "2023-01-10"),
            publication("7.68.0-1ubuntu2.9", "focal", "Proposed", "2023-01-09"),
            publication("7.68.0-1ubuntu2.8", "focal", "Backports", "2023-01-08"),
            publication("7.68.0-1ubuntu2.7", "focal", "Security", "2022-12-01"),
        ],
        vec![],
    );
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    let focal = DistroSeries::new("ubuntu", "focal");
    assert_eq!(
        r.pinned_version(&focal, "curl", date(2023, 6, 1)),
        Lookup::Found("7.68.0-1ubuntu2.7".to_string())
    );
}

#[test]
fn graduated_pin_falls_back_to_wildcards() {
    let t = archive_transport(
        vec![publication("7.68.0-1ubuntu2.7", "focal", "Updates", "2022-12-01")],
        series_routes(),
    );
    let probe = ScriptedProbe {
        accepted: vec!["curl=7.68.*".into()],
        ..ScriptedProbe::default()
    };
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(
        r.graduated_pin("ubuntu:20.04", "curl", date(2023, 1, 1)),
        PinOutcome::Pinned {
            reference: "curl=7.68.*".into(),
            level: WildcardLevel::Patch
        }
    );
    assert_eq!(
        probe.calls.borrow().as_slice(),
        ["curl=7.68.0-1ubuntu2.7", "curl=7.68.*"]
    );
}

#[test]
fn graduated_pin_gives_up_when_every_candidate_fails() {
    let t = archive_transport(
        vec![publication("7.68.0-1ubuntu2.7", "focal", "Updates", "2022-12-01")],
        series_routes(),
    );
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    let outcome = r.graduated_pin("ubuntu:20.04", "curl", date(2023, 1, 1));
    assert_eq!(
        outcome,
        PinOutcome::Unpinned {
            reference: "curl".into(),
            reason: PinFailure::ProbeRejected
        }
    );
    assert_eq!(probe.calls.borrow().len(), 3);
}

#[test]
fn inactive_archive_is_not_pinned() {
    let t = archive_transport(vec![], series_routes());
    let probe = ScriptedProbe::default();
    let r = VersionResolver::new(&t, &probe, &config());
    let outcome = r.graduated_pin("ubuntu:14.04", "curl", date(2016, 1, 1));
    assert!(matches!(outcome, PinOutcome::Unpinned { reason: PinFailure::UnknownDistro, .. }));
    assert!(probe.calls.borrow().is_empty());
}

#[test]
fn shell_availability_maps_probe_answers() {
    let t = MemoryTransport::routes(vec![]);
    let probe = ScriptedProbe {
        accepted: vec!["/bin/bash".into()],
        ..ScriptedProbe::default()
    };
    let r = VersionResolver::new(&t, &probe, &config());
    assert_eq!(r.shell_available("ubuntu", "/bin/bash"), Lookup::Found(true));
    assert_eq!(r.shell_available("alpine", "/bin/zsh"), Lookup::Found(false));
}

proptest! {
    #[test]
    fn pinned_version_is_newest_eligible_before_reference(
        days in proptest::collection::vec(0i64..1000, 0..12),
        cutoff in 0i64..1000,
    ) {
        // Newest first, as the archive orders them.
        let mut days = days;
        days.sort_unstable_by(|a, b| b.cmp(a));
        let epoch = date(2020, 1, 1);
        let entries: Vec<_> = days
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let published = epoch + chrono::Duration::days(*d);
                publication(&format!("1.{i}"), "focal", "Updates", &published.to_string())
            })
            .collect();
        let t = archive_transport(entries, vec![]);
        let probe = ScriptedProbe::default();
        let r = VersionResolver::new(&t, &probe, &config());

        let as_of = epoch + chrono::Duration::days(cutoff);
        let expected = days.iter().position(|d| *d < cutoff).map(|i| format!("1.{i}"));
        let answer = r.pinned_version(&DistroSeries::new("ubuntu", "focal"), "curl", as_of);
        prop_assert_eq!(answer, Lookup::from(expected.clone()));

        // A miss reads every page exactly once.
        if expected.is_none() {
            prop_assert_eq!(t.request_count(), days.len().div_ceil(2).max(1));
        }
    }

    #[test]
    fn tag_scan_without_latest_reads_each_page_once(count in 1usize..9) {
        let names: Vec<String> = (0..count).map(|i| format!("v{i}")).collect();
        let tags: Vec<(&str, &str, &str)> = names.iter().map(|n| (n.as_str(), "sha256:x", "2024-01-01")).collect();
        let t = MemoryTransport::routes(hub_routes("busybox", &tags));
        let probe = ScriptedProbe::default();
        let r = VersionResolver::new(&t, &probe, &config());
        prop_assert_eq!(r.latest_tag("busybox"), Lookup::NotFound);
        prop_assert_eq!(t.request_count(), count.div_ceil(2));
    }
}
