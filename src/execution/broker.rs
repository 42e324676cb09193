use thiserror::Error;

use crate::models::{OrderId, OrderRequest, OrderStatus};

#[derive(Debug, Error, PartialEq)]
pub enum BrokerError {
    #[error("no price available for {0}")]
    NoPrice(String),

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("unknown order {0}")]
    UnknownOrder(OrderId),

    #[error("order {0} is not open")]
    OrderNotOpen(OrderId),

    #[error("broker unavailable: {0}")]
    Unavailable(String),
}

/// Market access supplied by the trading framework
///
/// Implementations own price data, order routing and cash/position
/// bookkeeping. The strategy only talks to the market through this trait.
pub trait Broker {
    /// Latest traded price for `symbol`
    fn last_price(&self, symbol: &str) -> Result<f64, BrokerError>;

    /// Free cash in quote currency
    fn cash(&self) -> Result<f64, BrokerError>;

    /// Quantity currently held of `symbol`
    fn position(&self, symbol: &str) -> Result<f64, BrokerError>;

    fn submit_order(&mut self, request: OrderRequest) -> Result<OrderId, BrokerError>;

    fn cancel_order(&mut self, id: OrderId) -> Result<(), BrokerError>;

    fn order_status(&self, id: OrderId) -> Result<OrderStatus, BrokerError>;
}
