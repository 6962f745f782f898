//! Package version ordering
//!
//! Numeric-component-aware comparison of index version strings, so that
//! `1.10` sorts above `1.9` and `1.0` equals `1.0.0`. Covers the common
//! PEP-440 shapes published on the index: optional epoch (`N!`), dotted
//! release numbers, pre-releases (`a`/`b`/`rc`), `.postN` and `.devN`
//! suffixes. Local version labels (`+…`) are ignored for ordering.

use std::cmp::Ordering;

/// Pre-release tag, ordered `a < b < rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreTag {
    Unknown,
    Alpha,
    Beta,
    Rc,
}

/// A parsed version string with a total order.
///
/// Parsing never fails: unrecognized trailing segments are treated as a
/// pre-release-like marker that sorts below the plain release, which keeps
/// odd upstream version strings from masquerading as newer releases.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    epoch: u64,
    release: Vec<u64>,
    pre: Option<(PreTag, u64)>,
    post: Option<u64>,
    dev: Option<u64>,
}

impl PackageVersion {
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        let mut rest = lowered.as_str();
        rest = rest.strip_prefix('v').unwrap_or(rest);

        // Local version label never participates in ordering.
        if let Some((main, _local)) = rest.split_once('+') {
            rest = main;
        }

        let mut epoch = 0;
        if let Some((e, r)) = rest.split_once('!') {
            if let Ok(n) = e.parse() {
                epoch = n;
                rest = r;
            }
        }

        let mut version = PackageVersion {
            epoch,
            release: Vec::new(),
            pre: None,
            post: None,
            dev: None,
        };

        let mut in_release = true;
        for segment in rest.split(['.', '-', '_']) {
            if segment.is_empty() {
                continue;
            }
            if in_release && segment.bytes().all(|b| b.is_ascii_digit()) {
                version.release.push(segment.parse().unwrap_or(u64::MAX));
                continue;
            }
            in_release = false;
            version.apply_suffix(segment);
        }

        if version.release.is_empty() {
            version.release.push(0);
        }
        version
    }

    /// Fold one non-numeric segment (`rc1`, `0a2`, `post1`, `dev3`, ...)
    /// into the pre/post/dev slots.
    fn apply_suffix(&mut self, segment: &str) {
        let digits_end = segment
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or(segment.len());
        let (lead, tail) = segment.split_at(digits_end);
        if !lead.is_empty() && self.pre.is_none() && self.post.is_none() && self.dev.is_none() {
            // "0a2": numeric prefix still belongs to the release tuple.
            self.release.push(lead.parse().unwrap_or(u64::MAX));
        }

        let alpha_end = tail
            .bytes()
            .position(|b| b.is_ascii_digit())
            .unwrap_or(tail.len());
        let (word, number) = tail.split_at(alpha_end);
        let number: u64 = number.parse().unwrap_or(0);

        match word {
            "" => {}
            "a" | "alpha" => self.pre = Some((PreTag::Alpha, number)),
            "b" | "beta" => self.pre = Some((PreTag::Beta, number)),
            "rc" | "c" | "pre" | "preview" => self.pre = Some((PreTag::Rc, number)),
            "post" | "rev" | "r" => self.post = Some(number),
            "dev" => self.dev = Some(number),
            _ => {
                if self.pre.is_none() {
                    self.pre = Some((PreTag::Unknown, number));
                }
            }
        }
    }

    /// Ordering key for everything after the release tuple.
    ///
    /// Phases: dev-only < pre-release < release < post-release. A `.devN`
    /// attached to a pre or post sorts just below that pre/post without it.
    fn suffix_key(&self) -> (u8, PreTag, u64, u64) {
        let dev_key = self.dev.map_or(u64::MAX, |d| d);
        match (self.pre, self.post, self.dev) {
            (None, Some(n), _) => (3, PreTag::Unknown, n, dev_key),
            (None, None, None) => (2, PreTag::Unknown, 0, u64::MAX),
            (Some((tag, n)), _, _) => (1, tag, n, dev_key),
            (None, None, Some(d)) => (0, PreTag::Unknown, d, 0),
        }
    }
}

fn cmp_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| cmp_release(&self.release, &other.release))
            .then_with(|| self.suffix_key().cmp(&other.suffix_key()))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        PackageVersion::parse(s)
    }

    #[test]
    fn test_numeric_components() {
        assert!(v("1.2.0") > v("1.0.0"));
        assert!(v("1.10") > v("1.9"));
        assert!(v("0.10.1") > v("0.9.22"));
    }

    #[test]
    fn test_trailing_zeros_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("2"), v("2.0.0.0"));
    }

    #[test]
    fn test_pre_releases_sort_below_release() {
        assert!(v("1.0a1") < v("1.0"));
        assert!(v("1.0b2") < v("1.0rc1"));
        assert!(v("1.0a2") < v("1.0b1"));
        assert!(v("1.0rc1") < v("1.0"));
        assert!(v("1.0alpha1") < v("1.0beta1"));
    }

    #[test]
    fn test_post_and_dev() {
        assert!(v("1.0.post1") > v("1.0"));
        assert!(v("1.0.dev1") < v("1.0a1"));
        assert!(v("1.0.dev2") > v("1.0.dev1"));
        assert!(v("1.0.post2") > v("1.0.post1"));
    }

    #[test]
    fn test_epoch_dominates() {
        assert!(v("1!0.5") > v("99.9"));
    }

    #[test]
    fn test_v_prefix_and_whitespace() {
        assert_eq!(v("v1.2.3"), v(" 1.2.3 "));
    }

    #[test]
    fn test_local_label_ignored() {
        assert_eq!(v("1.0+local.3"), v("1.0"));
    }

    #[test]
    fn test_unknown_suffix_sorts_below_release() {
        assert!(v("1.0.weird") < v("1.0"));
        assert!(v("1.0.weird") > v("0.9"));
    }
}
