use super::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Contract security type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    Stock,
    Option,
    Future,
    Forex,
    Index,
    Cfd,
    Bond,
    Commodity,
    Crypto,
}

impl SecurityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "STK",
            Self::Option => "OPT",
            Self::Future => "FUT",
            Self::Forex => "CASH",
            Self::Index => "IND",
            Self::Cfd => "CFD",
            Self::Bond => "BOND",
            Self::Commodity => "CMDTY",
            Self::Crypto => "CRYPTO",
        }
    }
}

impl WireParam for SecurityType {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}
