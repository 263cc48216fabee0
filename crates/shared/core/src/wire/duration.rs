use super::WireParam;
use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Look-back span of a historical data request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoricalDuration {
    Seconds(u32),
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

impl HistoricalDuration {
    fn parts(&self) -> (u32, &'static str) {
        match *self {
            Self::Seconds(n) => (n, "S"),
            Self::Days(n) => (n, "D"),
            Self::Weeks(n) => (n, "W"),
            Self::Months(n) => (n, "M"),
            Self::Years(n) => (n, "Y"),
        }
    }

    /// Reject zero-length spans before anything is sent
    pub fn validate(&self) -> DomainResult<()> {
        let (amount, unit) = self.parts();
        if amount == 0 {
            return Err(DomainError::InvalidDuration(format!("0 {}", unit)));
        }
        Ok(())
    }
}

impl WireParam for HistoricalDuration {
    fn to_wire(&self) -> Cow<'static, str> {
        let (amount, unit) = self.parts();
        Cow::Owned(format!("{} {}", amount, unit))
    }
}
