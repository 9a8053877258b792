//! Tour step identifiers
//!
//! A step is either a plain number (`3`) or a sub-step nested inside a dialog
//! opened during its parent step (`"7b"`). Catalogs and deep links write both
//! forms; the wire shape is an integer for plain steps and a string otherwise.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::StepIdError;

lazy_static::lazy_static! {
    static ref STEP_ID_RE: Regex = Regex::new(r"^([0-9]+)([a-z])?$").expect("static regex");
}

/// Position within a tour page's script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "ts-rs", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts-rs", ts(type = "number | string"))]
pub enum StepId {
    Number(u32),
    Sub(u32, char),
}

impl StepId {
    /// Number shown as "Step N of Total"; sub-steps collapse to their parent
    pub fn display_number(self) -> u32 {
        match self {
            StepId::Number(n) | StepId::Sub(n, _) => n,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepId::Number(n) => write!(f, "{}", n),
            StepId::Sub(n, tag) => write!(f, "{}{}", n, tag),
        }
    }
}

impl FromStr for StepId {
    type Err = StepIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = STEP_ID_RE
            .captures(s.trim())
            .ok_or_else(|| StepIdError::Invalid(s.to_string()))?;
        let number: u32 = caps[1]
            .parse()
            .map_err(|_| StepIdError::Invalid(s.to_string()))?;
        if number == 0 {
            return Err(StepIdError::Invalid(s.to_string()));
        }
        match caps.get(2).and_then(|m| m.as_str().chars().next()) {
            Some(tag) => Ok(StepId::Sub(number, tag)),
            None => Ok(StepId::Number(number)),
        }
    }
}

impl From<u32> for StepId {
    fn from(n: u32) -> Self {
        StepId::Number(n)
    }
}

impl Serialize for StepId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StepId::Number(n) => serializer.serialize_u32(*n),
            StepId::Sub(..) => serializer.serialize_str(&self.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStepId {
    Number(u32),
    Text(String),
}

impl<'de> Deserialize<'de> for StepId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawStepId::deserialize(deserializer)? {
            RawStepId::Number(0) => Err(serde::de::Error::custom("step ids start at 1")),
            RawStepId::Number(n) => Ok(StepId::Number(n)),
            RawStepId::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}
