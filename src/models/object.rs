//! Attribute-bag view over live objects
//!
//! Objects are fetched through the dynamic API and kept as JSON. `ResourceObject`
//! puts defaulting accessors in front of the raw value so call sites never have
//! to chain `get(..).and_then(as_str)` themselves.

use serde_json::{Map, Value};

use super::refs::ResourceRef;

/// A live Kubernetes object as an untyped attribute bag
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceObject(Value);

/// One entry of `metadata.ownerReferences`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    pub uid: String,
    pub kind: String,
    pub name: String,
    pub api_version: String,
}

impl OwnerReference {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            uid: str_at(value, &["uid"]).to_string(),
            kind: str_at(value, &["kind"]).to_string(),
            name: str_at(value, &["name"]).to_string(),
            api_version: str_at(value, &["apiVersion"]).to_string(),
        })
    }
}

impl ResourceObject {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up a nested attribute by path
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        lookup(&self.0, path)
    }

    /// String at `path`, or "" when absent or not a string
    pub fn get_str(&self, path: &[&str]) -> &str {
        str_at(&self.0, path)
    }

    /// Integer at `path`, or 0 when absent or not an integer
    pub fn get_i64(&self, path: &[&str]) -> i64 {
        self.get(path).and_then(Value::as_i64).unwrap_or(0)
    }

    /// Object at `path`, if present
    pub fn get_map(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.get(path).and_then(Value::as_object)
    }

    /// Array at `path`, or an empty slice
    pub fn get_slice(&self, path: &[&str]) -> &[Value] {
        self.get(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn kind(&self) -> &str {
        self.get_str(&["kind"])
    }

    pub fn api_version(&self) -> &str {
        self.get_str(&["apiVersion"])
    }

    pub fn name(&self) -> &str {
        self.get_str(&["metadata", "name"])
    }

    /// Namespace, with an empty string treated as cluster-scoped
    pub fn namespace(&self) -> Option<&str> {
        Some(self.get_str(&["metadata", "namespace"])).filter(|ns| !ns.is_empty())
    }

    pub fn uid(&self) -> &str {
        self.get_str(&["metadata", "uid"])
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.get_map(&["metadata", "labels"])
            .and_then(|labels| labels.get(key))
            .and_then(Value::as_str)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.get_map(&["metadata", "annotations"])
            .and_then(|annotations| annotations.get(key))
            .and_then(Value::as_str)
    }

    /// Owner references in declaration order; malformed entries are dropped
    pub fn owner_references(&self) -> Vec<OwnerReference> {
        self.get_slice(&["metadata", "ownerReferences"])
            .iter()
            .filter_map(OwnerReference::from_value)
            .collect()
    }

    /// Whether any owner reference points at `uid`
    pub fn is_owned_by(&self, uid: &str) -> bool {
        !uid.is_empty()
            && self
                .get_slice(&["metadata", "ownerReferences"])
                .iter()
                .any(|owner| str_at(owner, &["uid"]) == uid)
    }

    /// Identity pointer for this object
    ///
    /// List responses usually omit `kind` on items, so callers pass the kind
    /// they listed as a fallback. `namespace` is used when the object carries none.
    pub fn to_ref(&self, fallback_kind: &str, namespace: Option<&str>) -> ResourceRef {
        let kind = match self.kind() {
            "" => fallback_kind,
            kind => kind,
        };
        ResourceRef {
            name: self.name().to_string(),
            kind: kind.to_string(),
            namespace: self.namespace().or(namespace).map(str::to_string),
            uid: self.uid().to_string(),
        }
    }
}

impl From<Value> for ResourceObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> &'a str {
    lookup(value, path).and_then(Value::as_str).unwrap_or("")
}
