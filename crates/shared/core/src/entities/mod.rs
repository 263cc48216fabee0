mod bar;
mod contract;
mod order;
mod order_action;
mod order_state;
mod order_type;
mod tick;
mod time_in_force;

pub use bar::Bar;
pub use contract::{Contract, ContractDetails};
pub use order::Order;
pub use order_action::{OrderAction, reverse_wire};
pub use order_state::{OrderState, OrderStatusUpdate};
pub use order_type::OrderType;
pub use tick::{MarketTick, TickType};
pub use time_in_force::TimeInForce;
