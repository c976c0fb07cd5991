pub mod registry;
pub mod service;
pub mod token;
pub mod wheel;

pub use crate::registry::{LinkError, LinkRegistry, LinkState, SpinLink, DEFAULT_TTL_SECS};
pub use crate::service::{IssuedLink, RedemptionService};
pub use crate::token::new_token;
pub use crate::wheel::{ConfigError, PrizeEntry, PrizeWheel};
