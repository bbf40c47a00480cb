//! Semantic version ordering
//!
//! Precedence follows semver rules: pre-release versions sort below the
//! release with the same numeric triple, and build metadata is ignored.
//! Strings that fail to parse never take part in ordering.

use std::cmp::Ordering;

use semver::Version;

/// Parse a version string, returning `None` for malformed input.
///
/// Surrounding whitespace is malformed; callers trim untrusted input first.
pub fn parse_version(raw: &str) -> Option<Version> {
    Version::parse(raw).ok()
}

/// Compare two version strings by semver precedence.
///
/// Returns `None` if either side is not a valid version.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    Some(a.cmp_precedence(&b))
}

/// Sort versions newest first.
///
/// Unparsable entries sink to the end. Versions with equal precedence keep a
/// stable order by their string form.
pub fn sort_descending(versions: &mut [String]) {
    versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => vb.cmp_precedence(&va).then_with(|| b.cmp(a)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_components_compare_numerically() {
        assert_eq!(compare_versions("0.0.10", "0.0.9"), Some(Ordering::Greater));
        assert_eq!(compare_versions("1.2.3", "1.2.3"), Some(Ordering::Equal));
    }

    #[test]
    fn test_prerelease_sorts_below_release() {
        assert_eq!(
            compare_versions("1.0.0-rc.1", "1.0.0"),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_versions("1.0.0-alpha", "1.0.0-beta"),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(
            compare_versions("1.0.0+build.1", "1.0.0+build.2"),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_invalid_never_compares() {
        assert_eq!(compare_versions("latest", "1.0.0"), None);
        assert_eq!(compare_versions("1.0", "1.0.0"), None);
        assert!(parse_version("").is_none());
    }

    #[test]
    fn test_padded_version_is_malformed() {
        assert!(parse_version(" 1.0.0").is_none());
        assert!(parse_version("1.0.0\n").is_none());
        assert!(parse_version("1.0.0").is_some());
    }

    #[test]
    fn test_sort_descending() {
        let mut versions: Vec<String> = ["0.0.2", "0.0.10", "0.0.1", "0.0.10-rc.1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_descending(&mut versions);
        assert_eq!(versions, vec!["0.0.10", "0.0.10-rc.1", "0.0.2", "0.0.1"]);
    }
}
