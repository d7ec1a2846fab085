//! Authentication Module
//!
//! Bearer credential verification and the per-request auth context.

mod token;

pub use token::{AuthContext, Claims, TokenValidator};

/// Length of the literal `"Bearer "` prefix stripped from the header value.
pub const BEARER_PREFIX_LEN: usize = 7;
