//! Card decks and their value orderings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// The card deck a session votes with.
///
/// The order of [`DeckType::values`] is meaningful: later cards rank higher
/// when breaking ties between equally popular votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeckType {
    #[default]
    Fibonacci,
    ModifiedFibonacci,
    #[serde(rename = "tshirt")]
    TShirt,
    Hydra,
    Classic,
}

impl DeckType {
    /// Ordered card values for this deck.
    pub fn values(&self) -> &'static [&'static str] {
        match self {
            DeckType::Fibonacci => &["0", "1", "2", "3", "5", "8", "13", "21", "34", "55", "89"],
            DeckType::ModifiedFibonacci => {
                &["0", "½", "1", "2", "3", "5", "8", "13", "20", "40", "100"]
            }
            DeckType::TShirt => &["XS", "S", "M", "L", "XL", "XXL"],
            DeckType::Hydra => &["?", "1", "2", "3", "5", "8", "13"],
            DeckType::Classic => &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"],
        }
    }

    /// Position of a card in the deck ordering, if it belongs to the deck.
    pub fn rank_of(&self, value: &str) -> Option<usize> {
        self.values().iter().position(|v| *v == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeckType::Fibonacci => "fibonacci",
            DeckType::ModifiedFibonacci => "modified_fibonacci",
            DeckType::TShirt => "tshirt",
            DeckType::Hydra => "hydra",
            DeckType::Classic => "classic",
        }
    }
}

impl fmt::Display for DeckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeckType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fibonacci" => Ok(DeckType::Fibonacci),
            "modified_fibonacci" => Ok(DeckType::ModifiedFibonacci),
            "tshirt" => Ok(DeckType::TShirt),
            "hydra" => Ok(DeckType::Hydra),
            "classic" => Ok(DeckType::Classic),
            other => Err(ValidationError::invalid_format(
                "deck_type",
                format!("unknown deck '{}'", other),
            )),
        }
    }
}
