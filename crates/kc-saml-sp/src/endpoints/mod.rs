//! Axum endpoint for the service provider.
//!
//! - **Login Endpoint** - starts SAML authentication, optionally for an
//!   aliased local entity
//!
//! # Example
//!
//! ```rust,ignore
//! use kc_saml_sp::endpoints::{sp_router, SpState};
//! use axum::Router;
//!
//! let app = Router::new()
//!     .merge(sp_router())
//!     .with_state(SpState::new(entry_point));
//! ```

mod login;
mod router;
mod state;

pub use login::*;
pub use router::*;
pub use state::*;
