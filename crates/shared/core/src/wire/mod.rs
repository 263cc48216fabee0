//! Wire vocabulary
//!
//! Every request parameter domain is a closed enumeration that projects to the
//! canonical string the gateway expects. The gateway layer only ever builds wire
//! fields through [`WireParam::to_wire`]; it never formats parameter strings itself.

mod bar_size;
mod currency;
mod duration;
mod exchange;
mod security_type;
mod what_to_show;

pub use bar_size::BarSize;
pub use currency::Currency;
pub use duration::HistoricalDuration;
pub use exchange::Exchange;
pub use security_type::SecurityType;
pub use what_to_show::WhatToShow;

use std::borrow::Cow;

/// Projection of a parameter value to its canonical wire string
pub trait WireParam {
    fn to_wire(&self) -> Cow<'static, str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Ensure the trait stays object-safe
    fn _assert_wire_param_object_safe(_: &dyn WireParam) {}
}
