//! Read access into the observed body of a cluster object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::{resolve, FieldPath};

/// The raw state of one object as delivered by the watch stream.
///
/// Accessors return `None` rather than failing when the body does not have
/// the expected shape; watch streams deliver whatever the cluster holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Body(Value);

impl Body {
    #[must_use]
    pub const fn new(raw: Value) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(&self) -> &Value {
        &self.0
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.metadata_str("uid")
    }

    #[must_use]
    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion")?.as_str()
    }

    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind")?.as_str()
    }

    #[must_use]
    pub fn labels(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata")?.get("labels")?.as_object()
    }

    #[must_use]
    pub fn annotations(&self) -> Option<&Map<String, Value>> {
        self.0.get("metadata")?.get("annotations")?.as_object()
    }

    /// The label's value, if present and a string.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels()?.get(key)?.as_str()
    }

    #[must_use]
    pub fn has_label(&self, key: &str) -> bool {
        self.labels().is_some_and(|labels| labels.contains_key(key))
    }

    /// The annotation's value, if present and a string.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations()?.get(key)?.as_str()
    }

    #[must_use]
    pub fn has_annotation(&self, key: &str) -> bool {
        self.annotations()
            .is_some_and(|annotations| annotations.contains_key(key))
    }

    /// Resolve an arbitrary field path through the body.
    #[must_use]
    pub fn field(&self, path: &FieldPath) -> Option<&Value> {
        resolve(&self.0, path)
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.0.get("metadata")?.get(key)?.as_str()
    }
}

impl From<Value> for Body {
    fn from(raw: Value) -> Self {
        Self(raw)
    }
}
