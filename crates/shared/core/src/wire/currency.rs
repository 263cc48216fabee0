use super::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Settlement currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Chf,
    Cad,
    Aud,
    Hkd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Chf => "CHF",
            Self::Cad => "CAD",
            Self::Aud => "AUD",
            Self::Hkd => "HKD",
        }
    }
}

impl WireParam for Currency {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}
