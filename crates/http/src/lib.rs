//! BloomKart REST client
//!
//! A reqwest client for the BloomKart storefront backend with JWT session
//! management: token persistence, proactive and reactive refresh, and a
//! session manager shared with whatever presents the session to the user.

pub mod client;
pub mod types;

pub use client::error::ClientError;
pub use client::session::{AuthBackend, SessionEvent, SessionManager, SessionState};
pub use client::token::{AccessClaims, TokenPair, decode_access_token};
pub use client::{BloomKartClient, BloomKartClientBuilder, RequestContext};
