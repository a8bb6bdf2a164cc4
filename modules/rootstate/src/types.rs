//! Change records and the meta-dispatch payload.

use rootstate_snapshot::Value;
use serde::Serialize;

/// One path's value transition, produced during a dispatch.
///
/// Records are handed out by value and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub path: String,
    pub new: Value,
    /// Mount path at the level where an inherited record was re-recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_branch: Option<String>,
}

impl Change {
    pub fn new(path: impl Into<String>, new: Value) -> Self {
        Self {
            path: path.into(),
            new,
            from_branch: None,
        }
    }

    /// Re-record this change as inherited from the branch mounted at `mount`.
    /// An existing tag from a deeper level is replaced.
    pub fn inherited_from(&self, mount: impl Into<String>) -> Self {
        Self {
            path: self.path.clone(),
            new: self.new.clone(),
            from_branch: Some(mount.into()),
        }
    }

    pub fn to_value(&self) -> Value {
        let record = Value::object()
            .with_key("path", Value::from(self.path.as_str()))
            .with_key("new", self.new.clone());
        match &self.from_branch {
            Some(mount) => record.with_key("fromBranch", Value::from(mount.as_str())),
            None => record,
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            path: value.get("path")?.as_str()?.to_owned(),
            new: value.get("new").cloned().unwrap_or_default(),
            from_branch: value
                .get("fromBranch")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }
}

/// Payload of the reserved meta-dispatch event: which event ran, with what
/// payload, and every change it made.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaDispatch {
    pub event_name: String,
    pub payload: Value,
    pub changes: Vec<Change>,
}

impl MetaDispatch {
    /// Encode as `{eventName, payload, changes}`.
    pub fn into_value(self) -> Value {
        Value::object()
            .with_key("eventName", Value::from(self.event_name))
            .with_key("payload", self.payload)
            .with_key("changes", self.changes.iter().map(Change::to_value).collect())
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let changes = value
            .get("changes")?
            .as_array()?
            .iter()
            .map(Change::from_value)
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            event_name: value.get("eventName")?.as_str()?.to_owned(),
            payload: value.get("payload").cloned().unwrap_or_default(),
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_serializes_in_camel_case() {
        let change = Change::new("name", Value::from("Bill")).inherited_from("sweet.child");
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(
            json,
            json!({"path": "name", "new": "Bill", "fromBranch": "sweet.child"})
        );
    }

    #[test]
    fn untagged_change_omits_from_branch() {
        let json = serde_json::to_value(Change::new("a.b", Value::from(1))).unwrap();
        assert_eq!(json, json!({"path": "a.b", "new": 1}));
    }

    #[test]
    fn inheriting_replaces_a_deeper_tag() {
        let inherited = Change::new("x", Value::Null).inherited_from("inner");
        assert_eq!(
            inherited.inherited_from("outer").from_branch.as_deref(),
            Some("outer")
        );
    }

    #[test]
    fn meta_dispatch_reads_back_from_its_payload() {
        let meta = MetaDispatch {
            event_name: "USER_CREATED".into(),
            payload: Value::from(json!({"name": "Tomas"})),
            changes: vec![Change::new("data.users", Value::from(json!([{"name": "Tomas"}])))],
        };
        let value = meta.clone().into_value();
        assert_eq!(value.get("eventName").unwrap(), &Value::from("USER_CREATED"));
        assert_eq!(MetaDispatch::from_value(&value), Some(meta));
    }

    #[test]
    fn malformed_meta_payload_is_rejected() {
        assert!(MetaDispatch::from_value(&Value::from(json!({"eventName": 1}))).is_none());
    }
}
