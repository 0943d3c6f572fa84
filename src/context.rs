//! Process-scoped context.
//!
//! Everything that would otherwise be an ambient global — configuration,
//! counters — is constructed once here and passed by reference into the
//! listener and room manager. Simulation code never looks anything up.

use crate::config::ServerConfig;
use crate::metrics::Metrics;

pub struct ServerContext {
    pub config: ServerConfig,
    pub metrics: Metrics,
}

impl ServerContext {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            metrics: Metrics::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_carries_config() {
        let mut config = ServerConfig::default();
        config.max_rooms = 7;
        let ctx = ServerContext::new(config);
        assert_eq!(ctx.config.max_rooms, 7);
        assert_eq!(ctx.metrics.snapshot().packets_received, 0);
    }
}
