//! PokéAPI endpoint names and URL construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Endpoints the harness exercises, each with its own circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Pokemon,
    Type,
    Ability,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::Pokemon, Endpoint::Type, Endpoint::Ability];

    /// Path segment, also used as the circuit breaker and storage key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pokemon => "pokemon",
            Self::Type => "type",
            Self::Ability => "ability",
        }
    }

    /// `{base_url}/{endpoint}/{id}`
    pub fn url(&self, base_url: &str, id: u32) -> String {
        format!("{}/{}/{}", base_url.trim_end_matches('/'), self.as_str(), id)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pokemon" => Ok(Self::Pokemon),
            "type" => Ok(Self::Type),
            "ability" => Ok(Self::Ability),
            _ => Err(format!("Unknown endpoint: {s}")),
        }
    }
}
