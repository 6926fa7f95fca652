//! Adapter layer: binds a backend system and an object path to the engine.
//!
//! [`ObjectBinding`] is the only place the engine calls the
//! [`ObjectSystem`](crate::domain::ObjectSystem) port. It memoizes the
//! object metadata and the transfer handle so each is resolved at most once
//! per stream.

mod error;
mod object_binding;

pub(crate) use error::from_system;
pub use object_binding::ObjectBinding;
