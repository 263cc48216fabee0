use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderAction, OrderType, TimeInForce};
use crate::error::{DomainError, DomainResult};
use crate::values::{Price, Quantity};

/// Order ticket as submitted to the gateway
///
/// The order id is not part of the ticket: it is the request id the controller
/// allocates when the order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub action: OrderAction,
    pub order_type: OrderType,
    pub quantity: Quantity,
    /// Required for Limit, StopLimit and LimitOnClose orders
    pub limit_price: Option<Price>,
    /// Stop trigger or trail amount; required for Stop, StopLimit and Trail orders
    pub aux_price: Option<Price>,
    pub time_in_force: TimeInForce,
    /// Allow execution outside regular trading hours
    pub outside_rth: bool,
}

impl Order {
    /// Create a new market order (DAY)
    pub fn market(action: OrderAction, quantity: Quantity) -> Self {
        Self {
            action,
            order_type: OrderType::Market,
            quantity,
            limit_price: None,
            aux_price: None,
            time_in_force: TimeInForce::Day,
            outside_rth: false,
        }
    }

    /// Create a new limit order
    pub fn limit(
        action: OrderAction,
        quantity: Quantity,
        limit_price: Price,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            action,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Some(limit_price),
            aux_price: None,
            time_in_force,
            outside_rth: false,
        }
    }

    /// Create a new stop order triggered at `stop_price`
    pub fn stop(action: OrderAction, quantity: Quantity, stop_price: Price) -> Self {
        Self {
            action,
            order_type: OrderType::Stop,
            quantity,
            limit_price: None,
            aux_price: Some(stop_price),
            time_in_force: TimeInForce::Gtc,
            outside_rth: false,
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn with_outside_rth(mut self, outside_rth: bool) -> Self {
        self.outside_rth = outside_rth;
        self
    }

    /// Same ticket with the reversed action, used to flatten or hedge a position
    pub fn offsetting(&self) -> Self {
        Self {
            action: self.action.reverse(),
            ..self.clone()
        }
    }

    /// Validate the order based on order type requirements
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.order_type.requires_limit_price() && self.limit_price.is_none() {
            return Err(DomainError::InvalidOrder(format!(
                "{} order requires a limit price",
                self.order_type.as_str()
            )));
        }
        if self.order_type.requires_aux_price() && self.aux_price.is_none() {
            return Err(DomainError::InvalidOrder(format!(
                "{} order requires an aux price",
                self.order_type.as_str()
            )));
        }
        if let Some(price) = self.limit_price {
            if price <= Decimal::ZERO {
                return Err(DomainError::InvalidOrder(format!(
                    "limit price must be positive, got {}",
                    price
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_market_order_valid() {
        let order = Order::market(OrderAction::Buy, dec!(100));
        assert!(order.validate().is_ok());
        assert_eq!(order.time_in_force, TimeInForce::Day);
    }

    #[test]
    fn test_limit_without_price_rejected() {
        let mut order = Order::limit(OrderAction::Sell, dec!(10), dec!(150.25), TimeInForce::Gtc);
        order.limit_price = None;
        assert!(matches!(order.validate(), Err(DomainError::InvalidOrder(_))));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let order = Order::market(OrderAction::Buy, Decimal::ZERO);
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_stop_requires_aux_price() {
        let mut order = Order::stop(OrderAction::Sell, dec!(5), dec!(99));
        assert!(order.validate().is_ok());
        order.aux_price = None;
        assert!(order.validate().is_err());
    }

    #[test]
    fn test_offsetting_order() {
        let order = Order::limit(OrderAction::ShortSell, dec!(25), dec!(10), TimeInForce::Day);
        let offset = order.offsetting();
        assert_eq!(offset.action, OrderAction::Buy);
        assert_eq!(offset.quantity, dec!(25));
        assert_eq!(offset.limit_price, Some(dec!(10)));
    }
}
