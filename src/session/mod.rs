//! HTTP identity pool and request pacing.
//!
//! Every component that makes an outbound request consults this module
//! first: the [`RateGovernor`] paces requests, rotates the session identity
//! on budget/age/blocking, and owns the only mutable shared state in the
//! core pipeline.

mod governor;
mod identity;

pub use governor::{
    is_blocked_status, parse_retry_after, GovernorLimits, RateGovernor, Session, SessionError,
    StealthProfile,
};
pub use identity::{image_client_user_agent, Identity};
