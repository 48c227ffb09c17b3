//! Forgeup status API server library.
//!
//! Exposes the router, state, and routes so integration tests and the
//! binary entrypoint share the exact same middleware stack.

pub mod router;
pub mod routes;
pub mod state;
