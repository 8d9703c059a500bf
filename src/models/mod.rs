//! # Response Models
//!
//! Typed views of the `/pokemon`, `/type` and `/ability` documents. Every
//! struct is two-tier: the fields the harness asserts on are strict, and
//! anything else the API returns lands in the `extra` map so new upstream
//! fields never break decoding and stay visible to callers.

pub mod ability;
pub mod pokemon;
pub mod pokemon_type;

pub use ability::{Ability, EffectEntry};
pub use pokemon::{Pokemon, PokemonAbility, PokemonSprites, PokemonStat, PokemonType};
pub use pokemon_type::{Type, TypePokemon};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Unrecognised fields captured alongside the known ones
pub type ExtraFields = Map<String, Value>;

/// A response document that did not match its model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{model}: failed to decode response: {message}")]
    Decode { model: &'static str, message: String },

    #[error("{model}.{field} must be greater than 0, got {value}")]
    NotPositive {
        model: &'static str,
        field: &'static str,
        value: i64,
    },

    #[error("{model}.{field} must not be negative, got {value}")]
    Negative {
        model: &'static str,
        field: &'static str,
        value: i64,
    },

    #[error("{model}.{field} must not be empty")]
    Empty {
        model: &'static str,
        field: &'static str,
    },
}

/// A model decoded from one PokéAPI endpoint
pub trait ApiModel: DeserializeOwned + Sized {
    /// Model name used in validation errors
    const MODEL: &'static str;

    /// Constraints serde cannot express
    fn validate(&self) -> Result<(), ValidationError>;

    /// Decode and validate a raw response document
    fn from_document(document: Value) -> Result<Self, ValidationError> {
        let model: Self =
            serde_json::from_value(document).map_err(|e| ValidationError::Decode {
                model: Self::MODEL,
                message: e.to_string(),
            })?;
        model.validate()?;
        Ok(model)
    }
}

/// `{name, url}` reference to another resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedResource {
    pub name: String,
    pub url: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

pub(crate) fn require_positive(
    model: &'static str,
    field: &'static str,
    value: i64,
) -> Result<(), ValidationError> {
    if value > 0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive {
            model,
            field,
            value,
        })
    }
}

pub(crate) fn require_non_negative(
    model: &'static str,
    field: &'static str,
    value: i64,
) -> Result<(), ValidationError> {
    if value >= 0 {
        Ok(())
    } else {
        Err(ValidationError::Negative {
            model,
            field,
            value,
        })
    }
}

pub(crate) fn require_non_empty(
    model: &'static str,
    field: &'static str,
    is_empty: bool,
) -> Result<(), ValidationError> {
    if is_empty {
        Err(ValidationError::Empty { model, field })
    } else {
        Ok(())
    }
}
