//! Batch collector configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

/// Rules shared by every collector of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// How long a freshly opened batch keeps accepting keys before it is
    /// dispatched. Concurrent resolvers polled in the same scheduling pass
    /// always land inside this window.
    pub window: Duration,
    /// Upper bound on keys per fetch. A batch that reaches it is dispatched
    /// right away and later keys open a new batch.
    pub max_batch_size: Option<NonZeroUsize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(1),
            max_batch_size: None,
        }
    }
}

impl BatchConfig {
    /// Create a new batch config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collection window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Cap the number of keys per fetch. Zero removes the cap.
    pub fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = NonZeroUsize::new(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_batch_size_means_unbounded() {
        let config = BatchConfig::new().with_max_batch_size(0);
        assert_eq!(config.max_batch_size, None);

        let config = config.with_max_batch_size(3);
        assert_eq!(config.max_batch_size.map(NonZeroUsize::get), Some(3));
    }
}
