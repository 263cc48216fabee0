use super::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Destination or listing exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// Gateway-side smart routing
    Smart,
    Nyse,
    Island,
    Arca,
    Globex,
    Cme,
    IdealPro,
    Lse,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "SMART",
            Self::Nyse => "NYSE",
            Self::Island => "ISLAND",
            Self::Arca => "ARCA",
            Self::Globex => "GLOBEX",
            Self::Cme => "CME",
            Self::IdealPro => "IDEALPRO",
            Self::Lse => "LSE",
        }
    }
}

impl WireParam for Exchange {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}
