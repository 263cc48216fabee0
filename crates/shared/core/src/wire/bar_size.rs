use super::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Bar granularity for historical data requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarSize {
    Sec1,
    Sec5,
    Sec10,
    Sec15,
    Sec30,
    Min1,
    Min2,
    Min3,
    Min5,
    Min15,
    Min30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Month1,
}

impl BarSize {
    pub const ALL: [BarSize; 16] = [
        Self::Sec1,
        Self::Sec5,
        Self::Sec10,
        Self::Sec15,
        Self::Sec30,
        Self::Min1,
        Self::Min2,
        Self::Min3,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Hour1,
        Self::Hour4,
        Self::Day1,
        Self::Week1,
        Self::Month1,
    ];

    /// Parse a wire bar size such as `"5 mins"`
    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.as_str() == raw)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sec1 => "1 secs",
            Self::Sec5 => "5 secs",
            Self::Sec10 => "10 secs",
            Self::Sec15 => "15 secs",
            Self::Sec30 => "30 secs",
            Self::Min1 => "1 min",
            Self::Min2 => "2 mins",
            Self::Min3 => "3 mins",
            Self::Min5 => "5 mins",
            Self::Min15 => "15 mins",
            Self::Min30 => "30 mins",
            Self::Hour1 => "1 hour",
            Self::Hour4 => "4 hours",
            Self::Day1 => "1 day",
            Self::Week1 => "1 week",
            Self::Month1 => "1 month",
        }
    }

    /// Bar length in seconds (months counted as 30 days)
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Sec1 => 1,
            Self::Sec5 => 5,
            Self::Sec10 => 10,
            Self::Sec15 => 15,
            Self::Sec30 => 30,
            Self::Min1 => 60,
            Self::Min2 => 120,
            Self::Min3 => 180,
            Self::Min5 => 300,
            Self::Min15 => 900,
            Self::Min30 => 1_800,
            Self::Hour1 => 3_600,
            Self::Hour4 => 14_400,
            Self::Day1 => 86_400,
            Self::Week1 => 604_800,
            Self::Month1 => 2_592_000,
        }
    }
}

impl WireParam for BarSize {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_units() {
        assert_eq!(BarSize::Min1.to_wire(), "1 min");
        assert_eq!(BarSize::Min5.to_wire(), "5 mins");
        assert_eq!(BarSize::Sec1.to_wire(), "1 secs");
        assert_eq!(BarSize::Day1.to_wire(), "1 day");
    }

    #[test]
    fn test_from_wire() {
        for size in BarSize::ALL {
            assert_eq!(BarSize::from_wire(size.as_str()), Some(size));
        }
        assert_eq!(BarSize::from_wire("7 mins"), None);
    }
}
