//! Interface version triples and the compatibility rule used by the API
//! registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of a published interface.
///
/// Compatibility for consumption requires an exact `major` match and a
/// provider `minor` at least as new as the consumer asked for. `patch`
/// never participates in the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True when a provider publishing `self` satisfies a consumer
    /// requesting `requested`.
    pub fn satisfies(&self, requested: &ApiVersion) -> bool {
        self.major == requested.major && self.minor >= requested.minor
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Version of the runtime itself.
pub const RUNTIME_VERSION: ApiVersion = ApiVersion::new(0, 5, 0);

/// Human-readable runtime version string.
pub const RUNTIME_VERSION_STRING: &str = "0.5.0 WIP";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_major_newer_minor_satisfies() {
        let provider = ApiVersion::new(1, 2, 0);
        assert!(provider.satisfies(&ApiVersion::new(1, 0, 0)));
        assert!(provider.satisfies(&ApiVersion::new(1, 2, 5)));
    }

    #[test]
    fn test_older_minor_rejected() {
        let provider = ApiVersion::new(1, 2, 0);
        assert!(!provider.satisfies(&ApiVersion::new(1, 3, 0)));
    }

    #[test]
    fn test_major_mismatch_rejected() {
        let provider = ApiVersion::new(2, 0, 0);
        assert!(!provider.satisfies(&ApiVersion::new(1, 0, 0)));
        assert!(!ApiVersion::new(1, 9, 0).satisfies(&ApiVersion::new(2, 0, 0)));
    }

    #[test]
    fn test_patch_ignored() {
        let provider = ApiVersion::new(1, 0, 7);
        assert!(provider.satisfies(&ApiVersion::new(1, 0, 9)));
    }

    #[test]
    fn test_display() {
        assert_eq!(ApiVersion::new(1, 2, 3).to_string(), "1.2.3");
    }
}
