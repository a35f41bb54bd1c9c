//! Version ordering and selection against a repository's offerings.
//!
//! A coordinate's version is a requested floor, not a pin: selection picks
//! the newest available version that is at least the request, which is what
//! lets an unchanged coordinate pick up a newly published release.

use std::cmp::Ordering;

use hotswap_common::types::VersionRequest;

/// Compares two version strings segment-by-segment.
///
/// Dot-separated segments compare numerically when both parse as integers,
/// lexicographically otherwise. A version with more segments orders after
/// its prefix (`1.0.1` > `1.0`).
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(ln), Ok(rn)) => ln.cmp(&rn),
                    _ => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Selects the version to resolve to from the available set.
///
/// Returns the newest version satisfying the request, or `None` when the
/// request cannot be satisfied (nothing available at or above the floor).
#[must_use]
pub fn select_version<'a>(available: &'a [String], request: &VersionRequest) -> Option<&'a str> {
    let candidates = available.iter().filter(|v| match request {
        VersionRequest::Latest => true,
        VersionRequest::Floor(floor) => compare_versions(v, floor) != Ordering::Less,
    });
    candidates
        .max_by(|a, b| compare_versions(a, b))
        .map(String::as_str)
}
