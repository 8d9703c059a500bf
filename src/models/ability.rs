//! `/ability/{id}` response model.

use crate::models::{
    require_non_empty, require_positive, ApiModel, ExtraFields, NamedResource, ValidationError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Effect description in one language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    pub language: NamedResource,
    pub short_effect: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: i64,
    pub name: String,
    pub is_main_series: bool,
    pub effect_entries: Vec<EffectEntry>,
    pub pokemon: Vec<Value>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ApiModel for Ability {
    const MODEL: &'static str = "Ability";

    fn validate(&self) -> Result<(), ValidationError> {
        require_positive(Self::MODEL, "id", self.id)?;
        require_non_empty(Self::MODEL, "name", self.name.is_empty())
    }
}

impl Ability {
    /// Short effect text for a language code such as `"en"`
    pub fn short_effect(&self, language: &str) -> Option<&str> {
        self.effect_entries
            .iter()
            .find(|entry| entry.language.name == language)
            .map(|entry| entry.short_effect.as_str())
    }
}
