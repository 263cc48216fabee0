use crate::error::{DomainError, DomainResult};
use crate::wire::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Ticker symbol as understood by the gateway
///
/// Symbols are normalized to upper case. Empty symbols and symbols containing
/// whitespace or control characters are rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> DomainResult<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(DomainError::InvalidSymbol(raw.to_string()));
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::InvalidSymbol(raw.to_string()));
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Symbol {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl WireParam for Symbol {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Owned(self.0.clone())
    }
}
