use chrono::{DateTime, Utc};
use rand::Rng;

use crate::registry::{LinkError, LinkRegistry, SpinLink};
use crate::wheel::{ConfigError, PrizeWheel};

/// Public fields of a freshly issued link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedLink {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

/// Orchestrates the registry and the wheel. The only component that touches
/// both, and the only place prize selection happens.
#[derive(Debug)]
pub struct RedemptionService {
    registry: LinkRegistry,
    wheel: PrizeWheel,
}

impl RedemptionService {
    /// Fails on a misconfigured wheel, so a bad prize table keeps the
    /// service from ever accepting traffic.
    pub fn new(registry: LinkRegistry, wheel: PrizeWheel) -> Result<Self, ConfigError> {
        wheel.validate()?;
        Ok(Self { registry, wheel })
    }

    pub fn generate_link(&self, now: DateTime<Utc>) -> IssuedLink {
        let link = self.registry.create(now);
        IssuedLink {
            id: link.id,
            expires_at: link.expires_at,
        }
    }

    /// Read-only passthrough; polling this never consumes the link.
    pub fn validate_link(&self, id: &str, now: DateTime<Utc>) -> Result<(), LinkError> {
        self.registry.check_validity(id, now)
    }

    /// Redeem with an injected draw in `[0, total_weight)`.
    ///
    /// The candidate prize is computed before the commit; if the registry
    /// rejects, the candidate is discarded and the draw has no observable
    /// effect, so racing attempts can never record two different prizes.
    pub fn redeem_link_with_draw(
        &self,
        id: &str,
        draw: f64,
        now: DateTime<Utc>,
    ) -> Result<String, LinkError> {
        let candidate = self.wheel.pick(draw);
        let link = self.registry.redeem(id, candidate, now)?;
        Ok(link.prize.expect("redeemed link carries its prize"))
    }

    /// Convenience: redeem with a fresh uniform draw.
    pub fn redeem_link(&self, id: &str, now: DateTime<Utc>) -> Result<String, LinkError> {
        let draw = rand::thread_rng().gen_range(0.0..self.wheel.total_weight());
        self.redeem_link_with_draw(id, draw, now)
    }

    /// Lookup for idempotent display of an already-spun link.
    pub fn link(&self, id: &str) -> Option<SpinLink> {
        self.registry.get(id)
    }

    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        self.registry.sweep_expired(now)
    }
}
