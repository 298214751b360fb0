//! Global config handle.
//!
//! Uses `arc-swap` for lock-free reads from request handlers.

use crate::config::BaleConfig;
use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<BaleConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(BaleConfig::default()));

#[inline]
pub fn cfg() -> Arc<BaleConfig> {
    CONFIG.load_full()
}

#[inline]
pub fn init_config(config: BaleConfig) -> Arc<BaleConfig> {
    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_config_publishes() {
        let mut config = BaleConfig::default();
        config.serve.port = 6001;
        let stored = init_config(config);
        assert!(Arc::ptr_eq(&stored, &cfg()));
        assert_eq!(cfg().serve.port, 6001);
    }
}
