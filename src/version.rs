//! Version comparison for detected vs. published component versions.

use std::cmp::Ordering;

/// Returns true when `latest` is strictly newer than `current`.
///
/// Plugin versions are often two-part (`4.9`) or four-part (`1.2.3.4`), so
/// anything semver rejects is compared numerically part by part.
pub fn is_newer(latest: &str, current: &str) -> bool {
    if let (Ok(latest_ver), Ok(current_ver)) = (
        semver::Version::parse(latest.trim_start_matches('v')),
        semver::Version::parse(current.trim_start_matches('v')),
    ) {
        return latest_ver > current_ver;
    }

    match (parse_dotted(latest), parse_dotted(current)) {
        (Some(l), Some(c)) => compare_dotted(&l, &c) == Ordering::Greater,
        _ => false,
    }
}

fn parse_dotted(version: &str) -> Option<Vec<u64>> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

fn compare_dotted(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}
