//! Character attributes
//!
//! 6개 기본 능력치. Persisted ids are the short forms (`str`, `dex`, ...).

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum Attribute {
    #[serde(rename = "str")]
    Strength,
    #[serde(rename = "dex")]
    Dexterity,
    #[serde(rename = "con")]
    Constitution,
    #[serde(rename = "intl")]
    Intellect,
    #[serde(rename = "end")]
    Endurance,
    #[serde(rename = "cha")]
    Charisma,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Strength,
        Attribute::Dexterity,
        Attribute::Constitution,
        Attribute::Intellect,
        Attribute::Endurance,
        Attribute::Charisma,
    ];

    /// Persisted identifier
    pub fn id(self) -> &'static str {
        match self {
            Attribute::Strength => "str",
            Attribute::Dexterity => "dex",
            Attribute::Constitution => "con",
            Attribute::Intellect => "intl",
            Attribute::Endurance => "end",
            Attribute::Charisma => "cha",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Strength => "Strength",
            Attribute::Dexterity => "Dexterity",
            Attribute::Constitution => "Constitution",
            Attribute::Intellect => "Intellect",
            Attribute::Endurance => "Endurance",
            Attribute::Charisma => "Charisma",
        }
    }

    /// Accepts the persisted id or the full name, case-insensitively.
    ///
    /// The retired `int` id is not accepted; only migration knows about it.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .into_iter()
            .find(|a| a.id().eq_ignore_ascii_case(id) || a.name().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAttribute(pub String);

impl fmt::Display for UnknownAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Unknown attribute: {}", self.0)
    }
}

impl std::error::Error for UnknownAttribute {}

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::from_id(s).ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}
