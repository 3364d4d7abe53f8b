//! Structural diffs between two observed states of an object.
//!
//! A diff is an ordered list of field-level items. Mappings are compared
//! key by key; scalars and arrays are compared as whole values. A `null`
//! value and an absent key are the same thing on both sides.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fields::{resolve, FieldPath};

/// What happened to one field between two observed states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOperation {
    Add,
    Change,
    Remove,
}

impl DiffOperation {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One field-level difference. `None` on either side means absence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffItem {
    pub operation: DiffOperation,
    pub field: FieldPath,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl DiffItem {
    #[must_use]
    pub fn new(
        operation: DiffOperation,
        field: FieldPath,
        old: Option<Value>,
        new: Option<Value>,
    ) -> Self {
        Self {
            operation,
            field,
            old,
            new,
        }
    }
}

/// Ordered sequence of field-level differences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diff {
    items: Vec<DiffItem>,
}

impl Diff {
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Compare two observed states.
    ///
    /// `None` and `Value::Null` both mean "absent", so a transition from
    /// `null` to a value is an addition, not a change.
    #[must_use]
    pub fn build(old: Option<&Value>, new: Option<&Value>) -> Self {
        let mut items = Vec::new();
        diff_into(old, new, FieldPath::root(), &mut items);
        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffItem> {
        self.items.iter()
    }

    /// The field paths touched by this diff, in item order.
    pub fn touched_fields(&self) -> impl Iterator<Item = &FieldPath> {
        self.items.iter().map(|item| &item.field)
    }

    /// Re-root the diff onto a sub-field.
    ///
    /// Items inside the scope keep their operation with the scope prefix
    /// stripped. Items strictly above the scope are resolved through the
    /// remaining tail and re-compared at the new root, so their operation
    /// may change (a broad `change` can reduce to an `add` of one field).
    /// Items outside the scope are dropped.
    #[must_use]
    pub fn reduce(&self, path: &FieldPath) -> Diff {
        if path.is_root() {
            return self.clone();
        }
        let mut items = Vec::new();
        for item in &self.items {
            if let Some(rest) = item.field.strip_prefix(path) {
                items.push(DiffItem::new(
                    item.operation,
                    rest,
                    item.old.clone(),
                    item.new.clone(),
                ));
            } else if let Some(tail) = path.strip_prefix(&item.field) {
                let old = item.old.as_ref().and_then(|value| resolve(value, &tail));
                let new = item.new.as_ref().and_then(|value| resolve(value, &tail));
                diff_into(old, new, FieldPath::root(), &mut items);
            }
        }
        Self { items }
    }
}

impl FromIterator<DiffItem> for Diff {
    fn from_iter<I: IntoIterator<Item = DiffItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a DiffItem;
    type IntoIter = std::slice::Iter<'a, DiffItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn diff_into(old: Option<&Value>, new: Option<&Value>, path: FieldPath, out: &mut Vec<DiffItem>) {
    let old = old.filter(|value| !value.is_null());
    let new = new.filter(|value| !value.is_null());
    match (old, new) {
        (None, None) => {}
        (None, Some(new)) => out.push(DiffItem::new(
            DiffOperation::Add,
            path,
            None,
            Some(new.clone()),
        )),
        (Some(old), None) => out.push(DiffItem::new(
            DiffOperation::Remove,
            path,
            Some(old.clone()),
            None,
        )),
        (Some(old), Some(new)) if old == new => {}
        (Some(Value::Object(old)), Some(Value::Object(new))) => {
            for (key, added) in new.iter().filter(|(key, _)| !old.contains_key(*key)) {
                diff_into(None, Some(added), path.child(key), out);
            }
            for (key, removed) in old.iter().filter(|(key, _)| !new.contains_key(*key)) {
                diff_into(Some(removed), None, path.child(key), out);
            }
            for (key, before) in old {
                if let Some(after) = new.get(key) {
                    diff_into(Some(before), Some(after), path.child(key), out);
                }
            }
        }
        (Some(old), Some(new)) => out.push(DiffItem::new(
            DiffOperation::Change,
            path,
            Some(old.clone()),
            Some(new.clone()),
        )),
    }
}
