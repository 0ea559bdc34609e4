//! Lantern Core - shared types for the signaling relay
//!
//! This crate contains the wire message definitions, the routing error
//! taxonomy, and client identifier allocation. It has no networking code.

pub mod error;
pub mod ident;
pub mod messages;

pub use error::RouteError;
pub use ident::allocate_client_id;
pub use messages::{Envelope, IceServer, ServerFrame};
