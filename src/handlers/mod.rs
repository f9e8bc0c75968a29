//! Request boundary handlers.
//!
//! Thin axum handlers that validate input shape, invoke the object
//! repository, and hand committed results to the change notifier.

pub mod events;
pub mod object;
