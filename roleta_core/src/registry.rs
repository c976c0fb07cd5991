use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::token::new_token;

/// TTL applied to new links unless the caller configures another one.
pub const DEFAULT_TTL_SECS: i64 = 5 * 60;

/// Lifecycle of a spin link. `Redeemed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Pending,
    Redeemed,
    Expired,
}

/// Why a link cannot be redeemed. Per-request outcomes, never faults;
/// callers branch on the variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Never issued, or already purged by the sweep.
    #[error("link not found")]
    NotFound,
    /// Already consumed; carries the recorded prize so callers can
    /// re-display the original result.
    #[error("link already redeemed")]
    AlreadyRedeemed { prize: String },
    #[error("link expired")]
    Expired,
}

/// One issued, single-use permission to spin.
///
/// `prize` and `redeemed_at` are unset until the link is redeemed, then both
/// are set together, exactly once. `expires_at` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinLink {
    pub id: String,
    pub state: LinkState,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub prize: Option<String>,
    pub redeemed_at: Option<DateTime<Utc>>,
}

impl SpinLink {
    /// The state every reader must act on: a `Pending` link past its
    /// deadline is `Expired`, whether or not the sweep has removed it yet.
    /// This is the only place `now` is compared against `expires_at`.
    pub fn effective_state(&self, now: DateTime<Utc>) -> LinkState {
        match self.state {
            LinkState::Pending if now > self.expires_at => LinkState::Expired,
            state => state,
        }
    }
}

/// In-memory store of outstanding spin links.
///
/// The registry is the storage boundary: callers hold the registry, never
/// the map, so the mutex-guarded `HashMap` can be swapped for another
/// structure without touching the redemption service. Methods take `now`
/// explicitly; the registry never reads the clock.
#[derive(Debug)]
pub struct LinkRegistry {
    ttl: Duration,
    links: Mutex<HashMap<String, SpinLink>>,
}

impl LinkRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            links: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh `Pending` link valid until `now + ttl`. Regenerates the
    /// token on the off chance it collides with a stored id.
    pub fn create(&self, now: DateTime<Utc>) -> SpinLink {
        let mut links = self.links.lock().expect("registry lock");
        let id = loop {
            let candidate = new_token();
            if !links.contains_key(&candidate) {
                break candidate;
            }
        };
        let link = SpinLink {
            id: id.clone(),
            state: LinkState::Pending,
            created_at: now,
            expires_at: now + self.ttl,
            prize: None,
            redeemed_at: None,
        };
        links.insert(id, link.clone());
        link
    }

    /// Snapshot of a stored link; `None` if never issued or already purged.
    pub fn get(&self, id: &str) -> Option<SpinLink> {
        self.links.lock().expect("registry lock").get(id).cloned()
    }

    /// Read-only validity check; never mutates storage, so callers may poll
    /// it freely without consuming the link.
    pub fn check_validity(&self, id: &str, now: DateTime<Utc>) -> Result<(), LinkError> {
        let links = self.links.lock().expect("registry lock");
        let link = links.get(id).ok_or(LinkError::NotFound)?;
        match link.effective_state(now) {
            LinkState::Pending => Ok(()),
            LinkState::Redeemed => Err(LinkError::AlreadyRedeemed {
                prize: link.prize.clone().unwrap_or_default(),
            }),
            LinkState::Expired => Err(LinkError::Expired),
        }
    }

    /// Atomic check-and-set: mark the link redeemed and record the prize, or
    /// reject without touching it. One lock acquisition spans the state
    /// check and the write, so for any id at most one concurrent caller ever
    /// sees `Ok`.
    pub fn redeem(&self, id: &str, prize: &str, now: DateTime<Utc>) -> Result<SpinLink, LinkError> {
        let mut links = self.links.lock().expect("registry lock");
        let link = links.get_mut(id).ok_or(LinkError::NotFound)?;
        match link.effective_state(now) {
            LinkState::Redeemed => Err(LinkError::AlreadyRedeemed {
                prize: link.prize.clone().unwrap_or_default(),
            }),
            LinkState::Expired => Err(LinkError::Expired),
            LinkState::Pending => {
                link.state = LinkState::Redeemed;
                link.prize = Some(prize.to_string());
                link.redeemed_at = Some(now);
                Ok(link.clone())
            }
        }
    }

    /// Drop every link whose deadline has passed, redeemed or not; returns
    /// the number removed. Purely a memory bound: expiry is re-derived from
    /// timestamps on every read, so answers never depend on whether the
    /// sweep has run.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut links = self.links.lock().expect("registry lock");
        let before = links.len();
        links.retain(|_, link| link.expires_at >= now);
        before - links.len()
    }

    /// Number of links currently stored, including expired ones the sweep
    /// has not visited yet.
    pub fn len(&self) -> usize {
        self.links.lock().expect("registry lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LinkRegistry {
        LinkRegistry::new(Duration::seconds(DEFAULT_TTL_SECS))
    }

    #[test]
    fn create_stores_a_pending_link() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);

        assert_eq!(link.state, LinkState::Pending);
        assert_eq!(link.created_at, now);
        assert_eq!(link.expires_at, now + Duration::seconds(DEFAULT_TTL_SECS));
        assert_eq!(link.prize, None);
        assert_eq!(link.redeemed_at, None);
        assert_eq!(reg.get(&link.id), Some(link));
    }

    #[test]
    fn back_to_back_creates_yield_distinct_ids() {
        let reg = registry();
        let now = Utc::now();
        let a = reg.create(now);
        let b = reg.create(now);
        assert_ne!(a.id, b.id);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn fresh_link_is_valid() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);
        assert_eq!(reg.check_validity(&link.id, now), Ok(()));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let reg = registry();
        assert_eq!(
            reg.check_validity("missing", Utc::now()),
            Err(LinkError::NotFound)
        );
        assert_eq!(
            reg.redeem("missing", "anything", Utc::now()),
            Err(LinkError::NotFound)
        );
    }

    #[test]
    fn redeem_records_prize_and_timestamp() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);
        let later = now + Duration::seconds(30);

        let redeemed = reg.redeem(&link.id, "Free green tea", later).unwrap();
        assert_eq!(redeemed.state, LinkState::Redeemed);
        assert_eq!(redeemed.prize.as_deref(), Some("Free green tea"));
        assert_eq!(redeemed.redeemed_at, Some(later));
        assert_eq!(redeemed.expires_at, link.expires_at);
    }

    #[test]
    fn second_redeem_rejected_and_prize_unchanged() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);

        reg.redeem(&link.id, "Free green tea", now).unwrap();
        let err = reg.redeem(&link.id, "Free lemon tea", now).unwrap_err();
        assert_eq!(
            err,
            LinkError::AlreadyRedeemed {
                prize: "Free green tea".to_string()
            }
        );
        let stored = reg.get(&link.id).unwrap();
        assert_eq!(stored.prize.as_deref(), Some("Free green tea"));
    }

    #[test]
    fn pending_link_past_deadline_reads_expired_without_sweep() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);
        let past_deadline = link.expires_at + Duration::seconds(1);

        assert_eq!(
            reg.check_validity(&link.id, past_deadline),
            Err(LinkError::Expired)
        );
        assert_eq!(
            reg.redeem(&link.id, "anything", past_deadline),
            Err(LinkError::Expired)
        );
        // The read did not mutate storage.
        assert_eq!(reg.get(&link.id).unwrap().state, LinkState::Pending);
    }

    #[test]
    fn redeem_allowed_exactly_at_deadline() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);
        assert!(reg.redeem(&link.id, "Free Thai tea", link.expires_at).is_ok());
    }

    #[test]
    fn sweep_removes_only_expired_links() {
        let reg = registry();
        let now = Utc::now();
        let fresh = reg.create(now);
        let old = reg.create(now - Duration::seconds(DEFAULT_TTL_SECS + 60));
        let redeemed_old = reg.create(now - Duration::seconds(DEFAULT_TTL_SECS + 60));
        reg.redeem(
            &redeemed_old.id,
            "Free boba pearls",
            redeemed_old.created_at,
        )
        .unwrap();

        let removed = reg.sweep_expired(now);
        assert_eq!(removed, 2);
        assert_eq!(reg.get(&old.id), None);
        assert_eq!(reg.get(&redeemed_old.id), None);
        assert!(reg.get(&fresh.id).is_some());

        // Purged ids now answer NotFound, as terminal as the pre-sweep
        // Expired outcome.
        assert_eq!(reg.check_validity(&old.id, now), Err(LinkError::NotFound));
    }

    #[test]
    fn sweep_keeps_unexpired_redeemed_links() {
        let reg = registry();
        let now = Utc::now();
        let link = reg.create(now);
        reg.redeem(&link.id, "Free whipped cream", now).unwrap();

        assert_eq!(reg.sweep_expired(now), 0);
        assert_eq!(
            reg.check_validity(&link.id, now),
            Err(LinkError::AlreadyRedeemed {
                prize: "Free whipped cream".to_string()
            })
        );
    }

    #[test]
    fn sweep_on_empty_registry_is_a_noop() {
        let reg = registry();
        assert!(reg.is_empty());
        assert_eq!(reg.sweep_expired(Utc::now()), 0);
    }
}
