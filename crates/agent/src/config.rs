use jester_core::{BrainConfig, RoutingThresholds};

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub routing: RoutingThresholds,
    /// When false strategic decisions never leave the rule path.
    pub advisory_enabled: bool,
    pub max_discard: usize,
    /// Decisions kept in the session log. Older entries are dropped first.
    pub log_capacity: usize,
    /// Advisory worker threads allowed to run at once, abandoned ones included.
    pub max_advisory_workers: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            routing: RoutingThresholds::default(),
            advisory_enabled: true,
            max_discard: 5,
            log_capacity: 512,
            max_advisory_workers: 2,
        }
    }
}

impl RouterConfig {
    pub fn from_brain(config: &BrainConfig) -> Self {
        Self {
            routing: config.routing.clone(),
            ..Self::default()
        }
    }
}
