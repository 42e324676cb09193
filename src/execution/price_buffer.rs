/// In-memory rolling window of prices for the traded pair
///
/// Keeps at most `max_prices` values; the oldest price is dropped first.
#[derive(Debug, Clone)]
pub struct PriceBuffer {
    data: Vec<f64>,
    max_prices: usize,
}

impl PriceBuffer {
    /// Create a new price buffer
    ///
    /// # Arguments
    /// * `max_prices` - Maximum number of prices to keep
    pub fn new(max_prices: usize) -> Self {
        Self {
            data: Vec::with_capacity(max_prices + 1),
            max_prices,
        }
    }

    /// Add a price
    ///
    /// If the buffer is full, removes the oldest price
    pub fn push(&mut self, price: f64) {
        self.data.push(price);

        let excess = self.data.len().saturating_sub(self.max_prices);
        if excess > 0 {
            self.data.drain(..excess);
        }
    }

    /// All prices, oldest first
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer() {
        let buffer = PriceBuffer::new(100);
        assert!(buffer.is_empty());
        assert!(buffer.values().is_empty());
    }

    #[test]
    fn test_push() {
        let mut buffer = PriceBuffer::new(100);

        buffer.push(100.0);
        buffer.push(101.0);
        buffer.push(102.0);

        let prices = buffer.values();
        assert_eq!(prices.to_vec(), vec![100.0, 101.0, 102.0]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_max_prices_limit() {
        let mut buffer = PriceBuffer::new(5);

        // Add 10 prices
        for i in 0..10 {
            buffer.push(100.0 + i as f64);
        }

        let prices = buffer.values();
        assert_eq!(prices.len(), 5); // Should only keep last 5

        // Should have prices 105-109
        assert_eq!(prices[0], 105.0);
        assert_eq!(prices[4], 109.0);
    }
}
