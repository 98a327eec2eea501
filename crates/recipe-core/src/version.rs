//! Recipe version parsing, ordering, and range matching.
//!
//! Versions are split into segments on `.`, `-` and `_`:
//! - Numeric segments compare as numbers and sort after textual segments
//! - When one version is a segment prefix of another, the shorter one sorts first
//! - Branch names such as `develop` or `main` sort after every numeric version
//!
//! Ranges use the `lo:hi` form. An upper bound also admits every version it
//! is a prefix of, so `:18` contains `18.4.1` and the exact range `18.2`
//! contains `18.2.1`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use recipe_util::errors::RecipeError;

/// Branch-like versions that sort above all numbered releases, highest first.
const INFINITY_VERSIONS: &[&str] = &["develop", "main", "master", "head", "trunk", "stable"];

/// A parsed recipe version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Text(String),
}

impl Version {
    pub fn parse(version: &str) -> Result<Self, RecipeError> {
        let version = version.trim();
        if version.is_empty() {
            return Err(RecipeError::parse(version, "empty version"));
        }
        if let Some(bad) = version
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(RecipeError::parse(
                version,
                format!("unexpected character '{bad}' in version"),
            ));
        }
        let segments = version
            .split(['.', '-', '_'])
            .filter(|s| !s.is_empty())
            .map(classify)
            .collect();
        Ok(Self {
            original: version.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Rank among the branch-like versions, if this is one.
    fn infinity_rank(&self) -> Option<usize> {
        let lower = self.original.to_lowercase();
        INFINITY_VERSIONS
            .iter()
            .position(|name| *name == lower)
            .map(|pos| INFINITY_VERSIONS.len() - pos)
    }

    /// True for branch-like versions (`develop`, `main`, ...).
    pub fn is_branch(&self) -> bool {
        self.infinity_rank().is_some()
    }

    /// True if every segment of `self` matches the leading segments of `other`.
    pub fn is_prefix_of(&self, other: &Version) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| compare_segments(a, b) == Ordering::Equal)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.infinity_rank(), other.infinity_rank()) {
            (Some(a), Some(b)) => return a.cmp(&b),
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => {}
        }
        for (a, b) in self.segments.iter().zip(&other.segments) {
            let ord = compare_segments(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.segments.len().cmp(&other.segments.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for Version {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.original)
    }
}

fn compare_segments(a: &Segment, b: &Segment) -> Ordering {
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => a.cmp(b),
        (Segment::Numeric(_), Segment::Text(_)) => Ordering::Greater,
        (Segment::Text(_), Segment::Numeric(_)) => Ordering::Less,
        (Segment::Text(a), Segment::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

fn classify(token: &str) -> Segment {
    match token.parse::<u64>() {
        Ok(n) => Segment::Numeric(n),
        Err(_) => Segment::Text(token.to_string()),
    }
}

/// A contiguous version range `lo:hi`; either side may be open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    pub lower: Option<Version>,
    pub upper: Option<Version>,
}

impl VersionRange {
    /// The range matching every version.
    pub fn any() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// A range matching `version` and every version it is a prefix of.
    pub fn exact(version: Version) -> Self {
        Self {
            lower: Some(version.clone()),
            upper: Some(version),
        }
    }

    /// Parse `lo:hi`, `lo:`, `:hi`, `:` or a bare version.
    pub fn parse(spec: &str) -> Result<Self, RecipeError> {
        let s = spec.trim();
        let bound = |part: &str| -> Result<Option<Version>, RecipeError> {
            let part = part.trim();
            if part.is_empty() {
                Ok(None)
            } else {
                Version::parse(part).map(Some)
            }
        };
        match s.split_once(':') {
            Some((lower, upper)) => {
                if upper.contains(':') {
                    return Err(RecipeError::parse(spec, "more than one ':' in version range"));
                }
                Ok(Self {
                    lower: bound(lower)?,
                    upper: bound(upper)?,
                })
            }
            None => Ok(Self::exact(Version::parse(s)?)),
        }
    }

    pub fn is_any(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// True when both bounds name the same version.
    pub fn is_exact(&self) -> bool {
        matches!((&self.lower, &self.upper), (Some(lo), Some(hi)) if lo == hi)
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            if version < lower {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            if version > upper && !upper.is_prefix_of(version) {
                return false;
            }
        }
        true
    }

    /// The range of versions contained in both `self` and `other`, if any.
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let lower = match (&self.lower, &other.lower) {
            (Some(a), Some(b)) => Some(a.max(b).clone()),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };
        let upper = match (&self.upper, &other.upper) {
            (Some(a), Some(b)) => Some(tighter_upper(a, b).clone()),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };
        if let (Some(lo), Some(hi)) = (&lower, &upper) {
            if lo > hi && !hi.is_prefix_of(lo) {
                return None;
            }
        }
        Some(VersionRange { lower, upper })
    }
}

/// Of two upper bounds, the one admitting fewer versions.
fn tighter_upper<'a>(a: &'a Version, b: &'a Version) -> &'a Version {
    if a.is_prefix_of(b) {
        b
    } else if b.is_prefix_of(a) {
        a
    } else {
        a.min(b)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            if let Some(ref v) = self.lower {
                return write!(f, "{v}");
            }
        }
        if let Some(ref lo) = self.lower {
            write!(f, "{lo}")?;
        }
        f.write_str(":")?;
        if let Some(ref hi) = self.upper {
            write!(f, "{hi}")?;
        }
        Ok(())
    }
}

/// A union of version ranges, written comma-separated (`:18,develop`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    ranges: Vec<VersionRange>,
}

impl VersionConstraint {
    pub fn any() -> Self {
        Self {
            ranges: vec![VersionRange::any()],
        }
    }

    pub fn parse(spec: &str) -> Result<Self, RecipeError> {
        let ranges = spec
            .split(',')
            .map(|part| {
                if part.trim().is_empty() {
                    Err(RecipeError::parse(spec, "empty entry in version list"))
                } else {
                    VersionRange::parse(part)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[VersionRange] {
        &self.ranges
    }

    pub fn is_any(&self) -> bool {
        self.ranges.iter().any(VersionRange::is_any)
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.ranges.iter().any(|r| r.contains(version))
    }

    /// Versions matching both constraints, or `None` if no version can.
    pub fn intersect(&self, other: &VersionConstraint) -> Option<VersionConstraint> {
        if self.is_any() {
            return Some(other.clone());
        }
        if other.is_any() {
            return Some(self.clone());
        }
        let mut ranges: Vec<VersionRange> = Vec::new();
        for a in &self.ranges {
            for b in &other.ranges {
                if let Some(r) = a.intersect(b) {
                    if !ranges.contains(&r) {
                        ranges.push(r);
                    }
                }
            }
        }
        if ranges.is_empty() {
            None
        } else {
            Some(VersionConstraint { ranges })
        }
    }
}

impl Default for VersionConstraint {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn basic_ordering() {
        assert!(v("18.2.1") < v("18.4.0"));
        assert!(v("18.4.0") < v("18.4.1"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn prefix_sorts_first() {
        assert!(v("18.4") < v("18.4.0"));
        assert!(v("1.4.0") < v("1.4.0.1"));
    }

    #[test]
    fn branch_versions_sort_last() {
        assert!(v("develop") > v("18.4.1"));
        assert!(v("develop") > v("main"));
        assert!(v("main") > v("99999"));
    }

    #[test]
    fn numeric_after_text() {
        assert!(v("1.0.0") > v("1.0.alpha"));
    }

    #[test]
    fn mixed_versions_parse() {
        assert!(v("428-alice1") > v("428"));
        assert_eq!(v("4-0-p1").to_string(), "4-0-p1");
        assert_eq!(v("6.16.00"), v("6.16.0"));
    }

    #[test]
    fn invalid_versions_rejected() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1.0+x").is_err());
    }

    #[test]
    fn range_upper_bound_is_prefix_aware() {
        let r = VersionRange::parse(":18").unwrap();
        assert!(r.contains(&v("18.4.1")));
        assert!(!r.contains(&v("19.0")));

        let r = VersionRange::parse(":18.4.0").unwrap();
        assert!(r.contains(&v("18.4.0")));
        assert!(!r.contains(&v("18.4.1")));
    }

    #[test]
    fn exact_range_matches_patch_releases() {
        let r = VersionRange::parse("18.2").unwrap();
        assert!(r.is_exact());
        assert!(r.contains(&v("18.2")));
        assert!(r.contains(&v("18.2.1")));
        assert!(!r.contains(&v("18.4.0")));
    }

    #[test]
    fn open_lower_range_includes_branches() {
        let r = VersionRange::parse("18.4:").unwrap();
        assert!(r.contains(&v("18.4.0")));
        assert!(r.contains(&v("develop")));
        assert!(!r.contains(&v("18.2.1")));
    }

    #[test]
    fn constraint_union() {
        let c = VersionConstraint::parse(":18,develop").unwrap();
        assert!(c.contains(&v("18.2.1")));
        assert!(c.contains(&v("develop")));
        assert!(!c.contains(&v("19.0")));
        assert_eq!(c.to_string(), ":18,develop");
    }

    #[test]
    fn intersect_pins_open_range() {
        let open = VersionConstraint::parse("1.4.0:").unwrap();
        let pinned = VersionConstraint::parse("1.4.0").unwrap();
        let merged = open.intersect(&pinned).unwrap();
        assert_eq!(merged.to_string(), "1.4.0");
    }

    #[test]
    fn intersect_raises_lower_bound() {
        let open = VersionConstraint::parse("1.7.0:").unwrap();
        let pinned = VersionConstraint::parse("1.8.1").unwrap();
        assert_eq!(open.intersect(&pinned).unwrap().to_string(), "1.8.1");
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = VersionConstraint::parse("1.68.0").unwrap();
        let b = VersionConstraint::parse("1.70:").unwrap();
        assert!(a.intersect(&b).is_none());
    }

    #[test]
    fn intersect_with_any() {
        let pinned = VersionConstraint::parse("10.5.1").unwrap();
        let merged = VersionConstraint::any().intersect(&pinned).unwrap();
        assert_eq!(merged, pinned);
    }

    #[test]
    fn display_forms() {
        assert_eq!(VersionRange::parse("3.13.4:").unwrap().to_string(), "3.13.4:");
        assert_eq!(VersionRange::parse(":1.69.99").unwrap().to_string(), ":1.69.99");
        assert_eq!(VersionRange::any().to_string(), ":");
    }
}
