// Market access and price history module
pub mod broker;
pub mod paper_broker;
pub mod price_buffer;

pub use broker::{Broker, BrokerError};
pub use paper_broker::{FillPolicy, Holding, PaperBroker};
pub use price_buffer::PriceBuffer;
