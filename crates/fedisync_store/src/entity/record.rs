//! Entity records.

use crate::entity::EntityId;
use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A server-defined record cached in the store.
///
/// An entity is a JSON object with an `id` field. Records are immutable
/// once built: updates produce a new `Entity` (see [`Entity::patched`]) and
/// replace the old record wholesale. Cloning is cheap; the body is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    body: Arc<Map<String, Value>>,
}

impl Entity {
    /// Builds an entity from a JSON value.
    ///
    /// Fails if the value is not an object or has no string/number `id`.
    /// A numeric id is normalized to a string in the stored body as well.
    pub fn from_value(value: Value) -> StoreResult<Self> {
        let mut body = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::NotAnObject {
                    found: json_type(&other),
                })
            }
        };

        let id = match body.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => {
                let id = n.to_string();
                body.insert("id".into(), Value::String(id.clone()));
                id
            }
            _ => return Err(StoreError::MissingId),
        };

        Ok(Self {
            id: EntityId::new(id),
            body: Arc::new(body),
        })
    }

    /// Builds an entity from any serializable type with an `id` field.
    pub fn from_typed<T: Serialize>(value: &T) -> StoreResult<Self> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::Encode(e.to_string()))?;
        Self::from_value(value)
    }

    /// Returns the entity id.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the JSON body.
    #[must_use]
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Returns a single field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Returns a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.body.get(field).and_then(Value::as_str)
    }

    /// Returns a boolean field.
    #[must_use]
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.body.get(field).and_then(Value::as_bool)
    }

    /// Returns an unsigned integer field.
    #[must_use]
    pub fn get_u64(&self, field: &str) -> Option<u64> {
        self.body.get(field).and_then(Value::as_u64)
    }

    /// Decodes the entity into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.to_value()).map_err(|e| StoreError::Decode {
            id: self.id.to_string(),
            message: e.to_string(),
        })
    }

    /// Returns a copy of this entity with `patch` applied to its body.
    ///
    /// The id is pinned: any change the patch makes to `id` is discarded.
    #[must_use]
    pub fn patched(&self, patch: impl FnOnce(&mut Map<String, Value>)) -> Self {
        let mut body = (*self.body).clone();
        patch(&mut body);
        body.insert("id".into(), Value::String(self.id.to_string()));
        Self {
            id: self.id.clone(),
            body: Arc::new(body),
        }
    }

    /// Returns a copy with the given top-level fields overwritten.
    #[must_use]
    pub fn merged(&self, fields: Map<String, Value>) -> Self {
        self.patched(|body| body.extend(fields))
    }

    /// Converts the entity back into a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object((*self.body).clone())
    }
}

impl TryFrom<Value> for Entity {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Returns the JSON type name of `value`, for error messages.
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn from_object_with_string_id() {
        let entity = Entity::from_value(json!({"id": "1", "content": "hello"})).unwrap();
        assert_eq!(entity.id(), &EntityId::from("1"));
        assert_eq!(entity.get_str("content"), Some("hello"));
    }

    #[test]
    fn numeric_id_is_normalized() {
        let entity = Entity::from_value(json!({"id": 42})).unwrap();
        assert_eq!(entity.id().as_str(), "42");
        assert_eq!(entity.get_str("id"), Some("42"));
    }

    #[test]
    fn rejects_non_objects_and_missing_ids() {
        assert_eq!(
            Entity::from_value(json!([1, 2])),
            Err(StoreError::NotAnObject { found: "array" })
        );
        assert_eq!(
            Entity::from_value(json!({"content": "x"})),
            Err(StoreError::MissingId)
        );
        assert_eq!(
            Entity::from_value(json!({"id": ""})),
            Err(StoreError::MissingId)
        );
        assert_eq!(
            Entity::from_value(json!({"id": null})),
            Err(StoreError::MissingId)
        );
    }

    #[test]
    fn json_type_names() {
        let names: Vec<_> = [json!(null), json!(true), json!(1.5), json!("x"), json!([]), json!({})]
            .iter()
            .map(json_type)
            .collect();
        assert_eq!(names, ["null", "boolean", "number", "string", "array", "object"]);
    }

    #[test]
    fn patched_pins_id() {
        let entity = Entity::from_value(json!({"id": "1", "following": false})).unwrap();
        let patched = entity.patched(|body| {
            body.insert("following".into(), json!(true));
            body.insert("id".into(), json!("2"));
        });

        assert_eq!(patched.id().as_str(), "1");
        assert_eq!(patched.get_str("id"), Some("1"));
        assert_eq!(patched.get_bool("following"), Some(true));
        // Original untouched.
        assert_eq!(entity.get_bool("following"), Some(false));
    }

    #[test]
    fn decode_typed() {
        #[derive(Debug, Deserialize, Serialize, PartialEq)]
        struct Account {
            id: String,
            acct: String,
        }

        let entity = Entity::from_value(json!({"id": "9", "acct": "alice"})).unwrap();
        let account: Account = entity.decode().unwrap();
        assert_eq!(account.acct, "alice");

        let back = Entity::from_typed(&account).unwrap();
        assert_eq!(back, entity);

        let bad = Entity::from_value(json!({"id": "9"})).unwrap();
        assert!(matches!(
            bad.decode::<Account>(),
            Err(StoreError::Decode { .. })
        ));
    }
}
