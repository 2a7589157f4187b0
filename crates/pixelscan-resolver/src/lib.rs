//! Target normalization, address resolution and pre-flight health checks.
//!
//! Raw targets go through [`normalize`] to become a [`Domain`]; the
//! [`Resolver`] then turns that domain into a reachable address by probing
//! an ordered list of candidate URLs. [`HealthChecker`] is the cheaper
//! DNS/HTTP pre-check that gates browser sessions.

pub mod error;
pub mod health;
pub mod normalize;
pub mod probe;
pub mod resolve;

pub use error::{FailedCandidate, ProbeError, ResolutionError, ValidationError};
pub use health::{HealthChecker, HealthReport};
pub use normalize::{normalize, validate, Domain};
pub use probe::{HttpProber, ProbeMethod, ProbeResponse, Prober};
pub use resolve::{candidates, suggest_alternatives, Resolved, Resolver};
