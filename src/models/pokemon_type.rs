//! `/type/{id}` response model.

use crate::models::{
    require_non_empty, require_positive, ApiModel, ExtraFields, NamedResource, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pokémon that has this type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePokemon {
    pub slot: i64,
    pub pokemon: NamedResource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    pub id: i64,
    pub name: String,
    pub damage_relations: Map<String, Value>,
    pub pokemon: Vec<TypePokemon>,
    pub moves: Vec<Value>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ApiModel for Type {
    const MODEL: &'static str = "Type";

    fn validate(&self) -> Result<(), ValidationError> {
        require_positive(Self::MODEL, "id", self.id)?;
        require_non_empty(Self::MODEL, "name", self.name.is_empty())
    }
}

impl Type {
    /// Names listed under one damage relation, e.g. `"double_damage_to"`
    pub fn damage_relation(&self, relation: &str) -> Vec<&str> {
        self.damage_relations
            .get(relation)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.get("name").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }
}
