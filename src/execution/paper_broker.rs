use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::execution::broker::{Broker, BrokerError};
use crate::models::{Order, OrderId, OrderRequest, OrderSide, OrderStatus};

/// Quantity held and what was paid for it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holding {
    pub quantity: f64,
    pub total_cost_basis: f64, // Total $ invested (for tracking average price)
}

impl Holding {
    /// Average entry price, if anything is held
    pub fn average_price(&self) -> Option<f64> {
        if self.quantity > 0.0 {
            Some(self.total_cost_basis / self.quantity)
        } else {
            None
        }
    }
}

/// When a limit order may fill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Fill on submission if the current price already crosses the limit
    #[default]
    Marketable,
    /// Only fill on a later price update that crosses the limit
    NextPrice,
}

/// In-memory broker for backtests and paper trading
///
/// Orders fill in full at their limit price once a price crosses them (see
/// `FillPolicy`). There is no partial fill, fee or slippage model.
pub struct PaperBroker {
    fill_policy: FillPolicy,
    cash: f64,
    holdings: HashMap<String, Holding>,
    marks: HashMap<String, f64>,
    orders: Vec<Order>,
    clock: DateTime<Utc>,
}

impl PaperBroker {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            fill_policy: FillPolicy::default(),
            cash: initial_cash,
            holdings: HashMap::new(),
            marks: HashMap::new(),
            orders: Vec::new(),
            clock: Utc::now(),
        }
    }

    pub fn with_fill_policy(mut self, fill_policy: FillPolicy) -> Self {
        self.fill_policy = fill_policy;
        self
    }

    /// Record a new market price and fill any resting orders it crosses
    ///
    /// # Returns
    /// Ids of the orders filled by this update
    pub fn update_price(&mut self, symbol: &str, price: f64, time: DateTime<Utc>) -> Vec<OrderId> {
        self.clock = time;
        self.marks.insert(symbol.to_string(), price);

        let crossing: Vec<OrderId> = self
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open && o.request.symbol == symbol)
            .filter(|o| crosses(&o.request, price))
            .map(|o| o.id)
            .collect();

        let mut filled = Vec::new();
        for id in crossing {
            if self.fill(id, time) {
                filled.push(id);
            }
        }

        filled
    }

    /// Fill an open order at its limit price; rejects it if it can no longer be covered
    fn fill(&mut self, id: OrderId, time: DateTime<Utc>) -> bool {
        let Some(order) = self.orders.iter_mut().find(|o| o.id == id) else {
            return false;
        };

        let request = order.request.clone();
        let notional = request.quantity * request.limit_price;
        let holding = self.holdings.entry(request.symbol.clone()).or_default();

        let covered = match request.side {
            OrderSide::Buy => notional <= self.cash,
            OrderSide::Sell => request.quantity <= holding.quantity,
        };

        if !covered {
            order.status = OrderStatus::Rejected;
            tracing::warn!(
                "Paper order {} rejected at fill: insufficient {}",
                id,
                if request.side == OrderSide::Buy { "cash" } else { "position" }
            );
            return false;
        }

        match request.side {
            OrderSide::Buy => {
                self.cash -= notional;
                holding.quantity += request.quantity;
                holding.total_cost_basis += notional;
            }
            OrderSide::Sell => {
                let avg = holding.average_price().unwrap_or(request.limit_price);
                self.cash += notional;
                holding.quantity -= request.quantity;
                holding.total_cost_basis -= avg * request.quantity;
            }
        }

        order.status = OrderStatus::Filled {
            price: request.limit_price,
        };
        order.filled_at = Some(time);

        tracing::debug!(
            "Paper fill {:?} {:.8} {} @ ${:.2}",
            request.side,
            request.quantity,
            request.symbol,
            request.limit_price
        );

        true
    }

    /// Cash plus holdings marked at the latest known prices
    pub fn portfolio_value(&self) -> f64 {
        let holdings_value: f64 = self
            .holdings
            .iter()
            .map(|(symbol, h)| h.quantity * self.marks.get(symbol).copied().unwrap_or(0.0))
            .sum();

        self.cash + holdings_value
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    /// All orders ever submitted, oldest first
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn open_orders(&self) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .collect()
    }
}

fn crosses(request: &OrderRequest, price: f64) -> bool {
    match request.side {
        OrderSide::Buy => price <= request.limit_price,
        OrderSide::Sell => price >= request.limit_price,
    }
}

impl Broker for PaperBroker {
    fn last_price(&self, symbol: &str) -> Result<f64, BrokerError> {
        self.marks
            .get(symbol)
            .copied()
            .ok_or_else(|| BrokerError::NoPrice(symbol.to_string()))
    }

    fn cash(&self) -> Result<f64, BrokerError> {
        Ok(self.cash)
    }

    fn position(&self, symbol: &str) -> Result<f64, BrokerError> {
        Ok(self.holdings.get(symbol).map(|h| h.quantity).unwrap_or(0.0))
    }

    fn submit_order(&mut self, request: OrderRequest) -> Result<OrderId, BrokerError> {
        if !(request.quantity > 0.0 && request.quantity.is_finite()) {
            return Err(BrokerError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if !(request.limit_price > 0.0 && request.limit_price.is_finite()) {
            return Err(BrokerError::InvalidOrder(format!(
                "limit price must be positive, got {}",
                request.limit_price
            )));
        }
        if request.side == OrderSide::Buy && request.quantity * request.limit_price > self.cash {
            return Err(BrokerError::InvalidOrder(format!(
                "insufficient cash: need ${:.2}, have ${:.2}",
                request.quantity * request.limit_price,
                self.cash
            )));
        }

        let marketable = self.fill_policy == FillPolicy::Marketable
            && self
                .marks
                .get(&request.symbol)
                .is_some_and(|&mark| crosses(&request, mark));

        let id = Uuid::new_v4();
        self.orders.push(Order {
            id,
            request,
            status: OrderStatus::Open,
            submitted_at: self.clock,
            filled_at: None,
        });

        if marketable {
            self.fill(id, self.clock);
        }

        Ok(id)
    }

    fn cancel_order(&mut self, id: OrderId) -> Result<(), BrokerError> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(BrokerError::UnknownOrder(id))?;

        if order.status != OrderStatus::Open {
            return Err(BrokerError::OrderNotOpen(id));
        }

        order.status = OrderStatus::Cancelled;
        Ok(())
    }

    fn order_status(&self, id: OrderId) -> Result<OrderStatus, BrokerError> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.status)
            .ok_or(BrokerError::UnknownOrder(id))
    }
}
