//! Retention policy for cached versions

/// Number of versions kept by default.
pub const DEFAULT_KEEP_VERSIONS: usize = 5;

/// Count-based retention policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of versions to keep (0 = unlimited)
    pub max_versions: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_versions: DEFAULT_KEEP_VERSIONS,
        }
    }
}

impl RetentionPolicy {
    /// Keep only the `count` newest versions.
    pub fn keep_last_n(count: usize) -> Self {
        Self {
            max_versions: count,
        }
    }

    /// Keep every version.
    pub fn unlimited() -> Self {
        Self { max_versions: 0 }
    }

    /// Versions that exceed the bound, given a newest-first list.
    pub fn excess<'a>(&self, newest_first: &'a [String]) -> &'a [String] {
        if self.max_versions == 0 || newest_first.len() <= self.max_versions {
            return &[];
        }
        &newest_first[self.max_versions..]
    }
}
