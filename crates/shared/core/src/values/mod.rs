use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

mod request_id;
mod symbol;

pub use request_id::RequestId;
pub use symbol::Symbol;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
