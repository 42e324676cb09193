use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier handed out by the broker for a submitted order
pub type OrderId = Uuid;

/// Single price observation for the traded pair
/// This is our core market data - one price per trading iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Lifecycle state of an order as reported by the broker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum OrderStatus {
    Open,
    Filled { price: f64 },
    Cancelled,
    Rejected,
}

/// Order ticket passed to the broker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub limit_price: f64,
}

impl OrderRequest {
    pub fn limit_buy(symbol: impl Into<String>, quantity: f64, limit_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side: OrderSide::Buy,
            quantity,
            limit_price,
        }
    }
}

/// Order as tracked by the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub request: OrderRequest,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_buy_creation() {
        let request = OrderRequest::limit_buy("X:BTCUSD", 0.001, 95_000.0);

        assert_eq!(request.symbol, "X:BTCUSD");
        assert_eq!(request.side, OrderSide::Buy);
        assert_eq!(request.quantity, 0.001);
        assert_eq!(request.limit_price, 95_000.0);
    }

    #[test]
    fn test_price_point_serde() {
        let json = r#"{"timestamp":"2025-01-02T00:00:00Z","price":94000.5}"#;
        let point: PricePoint = serde_json::from_str(json).unwrap();

        assert_eq!(point.price, 94000.5);
        assert_eq!(point.timestamp.to_rfc3339(), "2025-01-02T00:00:00+00:00");
    }
}
