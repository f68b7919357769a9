//! Endpoint pool with per-endpoint health.

use crate::{DEFAULT_COOLDOWN_MS, DEFAULT_STICKY_THRESHOLD};
use shared_types::Timestamp;
use wd_02_storage::{RoutingStrategy, RpcEndpoint};

/// Health counters for one endpoint.
#[derive(Debug, Clone, Default)]
pub struct EndpointHealth {
    pub success: u64,
    pub failure: u64,
    pub consecutive_failures: u32,
    pub cooldown_until: Option<Timestamp>,
    pub last_error: Option<String>,
}

impl EndpointHealth {
    fn in_cooldown(&self, now: Timestamp) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }
}

/// What an outcome report did to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeEffect {
    /// Nothing structural changed.
    Unchanged,
    /// The active endpoint rotated to this index.
    Rotated(usize),
    /// A previously-failing endpoint recovered.
    Recovered,
}

/// One chain's ordered endpoints plus routing state.
pub struct EndpointPool {
    endpoints: Vec<RpcEndpoint>,
    health: Vec<EndpointHealth>,
    strategy: RoutingStrategy,
    active: usize,
    cooldown_ms: u64,
    sticky_threshold: u32,
}

impl EndpointPool {
    #[must_use]
    pub fn new(endpoints: Vec<RpcEndpoint>, strategy: RoutingStrategy) -> Self {
        let health = endpoints.iter().map(|_| EndpointHealth::default()).collect();
        Self {
            endpoints,
            health,
            strategy,
            active: 0,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            sticky_threshold: DEFAULT_STICKY_THRESHOLD,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    #[must_use]
    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    /// The endpoint a new request should use.
    ///
    /// Failover always prefers the earliest endpoint not in cooldown;
    /// the other strategies stick with the rotation cursor.
    #[must_use]
    pub fn active_endpoint(&self, now: Timestamp) -> Option<&RpcEndpoint> {
        if self.endpoints.is_empty() {
            return None;
        }
        self.endpoints.get(self.selection_index(now))
    }

    fn selection_index(&self, now: Timestamp) -> usize {
        match self.strategy {
            RoutingStrategy::Failover => self
                .health
                .iter()
                .position(|h| !h.in_cooldown(now))
                .unwrap_or(self.active),
            RoutingStrategy::RoundRobin | RoutingStrategy::Sticky => self.active,
        }
    }

    /// Fold an RPC outcome into the counters and rotate per the strategy.
    /// Counters apply to the endpoint the pool selected for the call.
    pub fn record_outcome(
        &mut self,
        now: Timestamp,
        success: bool,
        error: Option<String>,
    ) -> OutcomeEffect {
        if self.endpoints.is_empty() {
            return OutcomeEffect::Unchanged;
        }
        let index = self.selection_index(now).min(self.health.len() - 1);

        if success {
            let health = &mut self.health[index];
            health.success += 1;
            health.consecutive_failures = 0;
            health.last_error = None;
            if health.cooldown_until.take().is_some() {
                return OutcomeEffect::Recovered;
            }
            return OutcomeEffect::Unchanged;
        }

        let should_rotate = {
            let health = &mut self.health[index];
            health.failure += 1;
            health.consecutive_failures += 1;
            health.cooldown_until = Some(now + self.cooldown_ms);
            health.last_error = error;
            match self.strategy {
                RoutingStrategy::RoundRobin => true,
                RoutingStrategy::Sticky => health.consecutive_failures >= self.sticky_threshold,
                RoutingStrategy::Failover => false,
            }
        };

        if should_rotate && self.endpoints.len() > 1 {
            self.active = (self.active + 1) % self.endpoints.len();
            self.health[self.active].consecutive_failures = 0;
            return OutcomeEffect::Rotated(self.active);
        }
        OutcomeEffect::Unchanged
    }

    /// Health view for diagnostics.
    #[must_use]
    pub fn health(&self) -> &[EndpointHealth] {
        &self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str) -> RpcEndpoint {
        RpcEndpoint {
            url: url.into(),
            weight: 1,
            auth: None,
        }
    }

    fn pool(strategy: RoutingStrategy) -> EndpointPool {
        EndpointPool::new(
            vec![endpoint("https://a"), endpoint("https://b"), endpoint("https://c")],
            strategy,
        )
    }

    #[test]
    fn test_round_robin_rotates_on_failure() {
        let mut pool = pool(RoutingStrategy::RoundRobin);
        assert_eq!(pool.active_endpoint(0).unwrap().url, "https://a");

        assert_eq!(
            pool.record_outcome(0, false, Some("timeout".into())),
            OutcomeEffect::Rotated(1)
        );
        assert_eq!(pool.active_endpoint(0).unwrap().url, "https://b");

        pool.record_outcome(0, false, None);
        pool.record_outcome(0, false, None);
        // Wrapped around.
        assert_eq!(pool.active_endpoint(0).unwrap().url, "https://a");
    }

    #[test]
    fn test_sticky_waits_for_threshold() {
        let mut pool = pool(RoutingStrategy::Sticky);
        assert_eq!(pool.record_outcome(0, false, None), OutcomeEffect::Unchanged);
        assert_eq!(pool.record_outcome(0, false, None), OutcomeEffect::Unchanged);
        assert_eq!(pool.record_outcome(0, false, None), OutcomeEffect::Rotated(1));
    }

    #[test]
    fn test_sticky_success_resets_the_streak() {
        let mut pool = pool(RoutingStrategy::Sticky);
        pool.record_outcome(0, false, None);
        pool.record_outcome(0, false, None);
        pool.record_outcome(0, true, None);
        assert_eq!(pool.record_outcome(0, false, None), OutcomeEffect::Unchanged);
        assert_eq!(pool.active_endpoint(0).unwrap().url, "https://a");
    }

    #[test]
    fn test_failover_prefers_earliest_healthy() {
        let mut pool = pool(RoutingStrategy::Failover);
        pool.record_outcome(100, false, Some("boom".into()));
        // "a" is cooling down; next selection skips it.
        assert_eq!(pool.active_endpoint(101).unwrap().url, "https://b");
        // After the cooldown expires, "a" is preferred again.
        assert_eq!(
            pool.active_endpoint(100 + DEFAULT_COOLDOWN_MS).unwrap().url,
            "https://a"
        );
    }

    #[test]
    fn test_success_after_failure_reports_recovery() {
        let mut pool = pool(RoutingStrategy::Failover);
        pool.record_outcome(0, false, Some("boom".into()));
        // While the first endpoint cools down, outcomes land on the
        // stand-in and are not a recovery.
        assert_eq!(pool.record_outcome(1, true, None), OutcomeEffect::Unchanged);
        // After the cooldown expires the original endpoint serves again;
        // its first success clears the stale cooldown mark.
        assert_eq!(
            pool.record_outcome(DEFAULT_COOLDOWN_MS + 1, true, None),
            OutcomeEffect::Recovered
        );
        assert!(pool.health()[0].cooldown_until.is_none());
        assert_eq!(pool.health()[0].failure, 1);
        assert_eq!(pool.health()[0].success, 1);
    }

    #[test]
    fn test_empty_pool() {
        let mut pool = EndpointPool::new(vec![], RoutingStrategy::RoundRobin);
        assert!(pool.active_endpoint(0).is_none());
        assert_eq!(pool.record_outcome(0, false, None), OutcomeEffect::Unchanged);
    }
}
