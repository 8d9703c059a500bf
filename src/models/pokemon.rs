//! `/pokemon/{id}` response model.

use crate::models::{
    require_non_empty, require_non_negative, require_positive, ApiModel, ExtraFields,
    NamedResource, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Type slot on a Pokémon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonType {
    pub slot: i64,
    #[serde(rename = "type")]
    pub type_ref: NamedResource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonAbility {
    pub is_hidden: bool,
    pub slot: i64,
    pub ability: NamedResource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonStat {
    pub base_stat: i64,
    /// Effort points gained for this stat
    pub effort: i64,
    pub stat: NamedResource,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Sprite URLs. Nested collections such as `other` and `versions` stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokemonSprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub back_default: Option<String>,
    #[serde(default)]
    pub front_shiny: Option<String>,
    #[serde(default)]
    pub back_shiny: Option<String>,
    #[serde(default)]
    pub front_female: Option<String>,
    #[serde(default)]
    pub back_female: Option<String>,
    #[serde(default)]
    pub front_shiny_female: Option<String>,
    #[serde(default)]
    pub back_shiny_female: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub base_experience: Option<i64>,
    /// Decimetres
    pub height: i64,
    /// Hectograms
    pub weight: i64,
    pub types: Vec<PokemonType>,
    pub abilities: Vec<PokemonAbility>,
    pub stats: Vec<PokemonStat>,
    pub sprites: PokemonSprites,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ApiModel for Pokemon {
    const MODEL: &'static str = "Pokemon";

    fn validate(&self) -> Result<(), ValidationError> {
        require_positive(Self::MODEL, "id", self.id)?;
        require_non_empty(Self::MODEL, "name", self.name.is_empty())?;
        require_non_negative(Self::MODEL, "height", self.height)?;
        require_non_negative(Self::MODEL, "weight", self.weight)?;
        require_non_empty(Self::MODEL, "types", self.types.is_empty())?;
        require_non_empty(Self::MODEL, "abilities", self.abilities.is_empty())?;
        require_non_empty(Self::MODEL, "stats", self.stats.is_empty())?;
        Ok(())
    }
}

impl Pokemon {
    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.type_ref.name.as_str()).collect()
    }

    /// Base value of the named stat, e.g. `"hp"`
    pub fn base_stat(&self, name: &str) -> Option<i64> {
        self.stats
            .iter()
            .find(|s| s.stat.name == name)
            .map(|s| s.base_stat)
    }
}
