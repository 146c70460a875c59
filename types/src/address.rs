//! Participant identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ParamsError;

/// An opaque participant identity attributed by the transport layer.
///
/// The registry never authenticates addresses; it only compares them. An
/// address is never empty: every conversion from a string, including
/// deserialization, goes through [`Address::parse`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Address(String);

impl Address {
    /// Build a fixture address from a known-good literal.
    ///
    /// # Panics
    /// Panics if the string is empty. Only compiled for tests.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(!s.is_empty(), "address must not be empty");
        Self(s)
    }

    /// Parse an address, rejecting the empty string.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ParamsError> {
        let s = raw.into();
        if s.is_empty() {
            return Err(ParamsError::EmptyAddress);
        }
        Ok(Self(s))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = ParamsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = ParamsError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl std::str::FromStr for Address {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
