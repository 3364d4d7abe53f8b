//! Coordinates of resource kinds served by the cluster API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one resource kind: API group, version, and plural name.
///
/// The core API group is represented by an empty `group` string, which
/// changes how [`Resource::name`] and [`Resource::api_version`] render.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    /// API group, empty for the core group.
    pub group: String,
    /// Version within the group, e.g. `v1`.
    pub version: String,
    /// Plural name used in API endpoints, e.g. `widgets`.
    pub plural: String,
}

impl Resource {
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        plural: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            plural: plural.into(),
        }
    }

    /// Canonical name: `{plural}.{group}`, or the bare plural for the core group.
    #[must_use]
    pub fn name(&self) -> String {
        if self.group.is_empty() {
            self.plural.clone()
        } else {
            format!("{}.{}", self.plural, self.group)
        }
    }

    /// API version string: `{group}/{version}`, or the bare version for the core group.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_group_naming() {
        let resource = Resource::new("example.com", "v1", "widgets");
        assert_eq!(resource.name(), "widgets.example.com");
        assert_eq!(resource.api_version(), "example.com/v1");
        assert_eq!(resource.to_string(), "widgets.example.com");
    }

    #[test]
    fn test_core_group_naming() {
        let resource = Resource::new("", "v1", "pods");
        assert_eq!(resource.name(), "pods");
        assert_eq!(resource.api_version(), "v1");
    }

    #[test]
    fn test_usable_as_map_key() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(Resource::new("example.com", "v1", "widgets"), 1);
        map.insert(Resource::new("example.com", "v1", "gadgets"), 2);

        let key = Resource::new("example.com", "v1", "widgets");
        assert_eq!(map.get(&key), Some(&1));
    }

    #[test]
    fn test_serialization_round_trip() {
        let resource = Resource::new("example.com", "v1", "widgets");
        let json = serde_json::to_string(&resource).unwrap();
        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resource);
    }
}
