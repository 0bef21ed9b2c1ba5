//! Closed-set configuration values.
//!
//! Each enum only ever holds one of its literals. The "no value yet" state is
//! modelled as `Option::None` on the config field and persisted as an empty
//! string, so partially filled files still load while typos fail at parse time.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{IntoEnumIterator, VariantNames};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("invalid {kind} \"{value}\": must be one of {}", .allowed.join(", "))]
#[diagnostic(code(instconfig::parse_enum))]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

/// A string-backed enum whose legal values are a fixed list of literals.
pub trait ClosedSet:
    Copy + Eq + fmt::Debug + AsRef<str> + IntoEnumIterator + VariantNames + 'static
{
    /// Human readable name used in error messages.
    const KIND: &'static str;

    /// Exact, case-sensitive membership test. No trimming.
    fn is_valid(value: &str) -> bool {
        Self::iter().any(|v| v.as_ref() == value)
    }

    fn parse_literal(value: &str) -> Result<Self, ParseEnumError> {
        Self::iter()
            .find(|v| v.as_ref() == value)
            .ok_or_else(|| ParseEnumError {
                kind: Self::KIND,
                value: value.to_string(),
                allowed: Self::VARIANTS,
            })
    }

    fn as_str(&self) -> &str {
        self.as_ref()
    }
}

/// How the installer wires the host network bridges.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum BridgeMode {
    /// NAT bridge on the private subnet only.
    Internal,
    /// Bridge on the physical uplink only.
    External,
    Both,
}

impl ClosedSet for BridgeMode {
    const KIND: &'static str = "bridge mode";
}

/// ZFS redundancy layout for the root pool.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::AsRefStr,
    strum::EnumIter,
    strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum RaidLevel {
    Single,
    Raid0,
    Raid1,
}

impl ClosedSet for RaidLevel {
    const KIND: &'static str = "raid level";
}

impl RaidLevel {
    /// Smallest number of disks the layout can be built from.
    pub fn min_disks(self) -> usize {
        match self {
            RaidLevel::Single => 1,
            RaidLevel::Raid0 => 2,
            RaidLevel::Raid1 => 2,
        }
    }
}

impl FromStr for BridgeMode {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_literal(s)
    }
}

impl FromStr for RaidLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_literal(s)
    }
}

impl Serialize for BridgeMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BridgeMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_literal(&raw).map_err(serde::de::Error::custom)
    }
}

impl Serialize for RaidLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RaidLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_literal(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<T: ClosedSet>` fields.
///
/// `None` is written as `""`. On read, an empty string or a null maps to
/// `None`, any other literal outside the set is a hard error.
pub mod optional {
    use super::ClosedSet;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: ClosedSet,
        S: Serializer,
    {
        serializer.serialize_str(value.as_ref().map_or("", |v| v.as_str()))
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: ClosedSet,
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => T::parse_literal(&raw)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
