//! Response validators.

use crate::error::ValidationError;
use fedisync_store::{json_type, Entity};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Turns a response body into an entity.
pub trait Schema: Send + Sync {
    /// Validates one entity.
    fn parse(&self, value: Value) -> Result<Entity, ValidationError>;

    /// Validates a JSON array of entities. Fails on the first bad element.
    fn parse_many(&self, value: Value) -> Result<Vec<Entity>, ValidationError> {
        match value {
            Value::Array(items) => items.into_iter().map(|item| self.parse(item)).collect(),
            other => Err(ValidationError::NotAnArray {
                found: json_type(&other),
            }),
        }
    }
}

/// Accepts any JSON object with an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyEntity;

impl Schema for AnyEntity {
    fn parse(&self, value: Value) -> Result<Entity, ValidationError> {
        Ok(Entity::from_value(value)?)
    }
}

/// Validates against a serde type, storing the normalized form.
///
/// Unknown fields are dropped and defaults filled in by the round trip
/// through `T`.
pub struct Typed<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Typed<T> {
    /// Creates the validator.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T> Schema for Typed<T>
where
    T: DeserializeOwned + Serialize,
{
    fn parse(&self, value: Value) -> Result<Entity, ValidationError> {
        let typed: T =
            serde_json::from_value(value).map_err(|e| ValidationError::Schema(e.to_string()))?;
        Ok(Entity::from_typed(&typed)?)
    }
}

/// The default schema.
pub fn any_entity() -> Arc<dyn Schema> {
    Arc::new(AnyEntity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Account {
        id: String,
        acct: String,
        #[serde(default)]
        followers_count: u64,
    }

    #[test]
    fn any_entity_requires_object_with_id() {
        let entity = AnyEntity.parse(json!({"id": 5, "x": 1})).unwrap();
        assert_eq!(entity.id().as_str(), "5");

        assert!(matches!(
            AnyEntity.parse(json!({"x": 1})),
            Err(ValidationError::Entity(_))
        ));
        assert!(AnyEntity.parse(json!("nope")).is_err());
    }

    #[test]
    fn typed_normalizes() {
        let schema = Typed::<Account>::new();
        let entity = schema
            .parse(json!({"id": "1", "acct": "alex", "extra": true}))
            .unwrap();
        assert_eq!(entity.get_u64("followers_count"), Some(0));
        assert!(entity.get("extra").is_none());

        assert!(matches!(
            schema.parse(json!({"id": "1"})),
            Err(ValidationError::Schema(_))
        ));
    }

    #[test]
    fn parse_many_checks_shape() {
        let entities = AnyEntity
            .parse_many(json!([{"id": "1"}, {"id": "2"}]))
            .unwrap();
        assert_eq!(entities.len(), 2);

        assert_eq!(
            AnyEntity.parse_many(json!({"id": "1"})),
            Err(ValidationError::NotAnArray { found: "object" })
        );
        assert!(AnyEntity.parse_many(json!([{"id": "1"}, 3])).is_err());
    }
}
