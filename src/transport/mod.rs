//! Node-to-Node Transport
//!
//! HTTP surface of a replica node (axum) and the client side used by the coordinator
//! (reqwest). Tasks travel as [`TaskEnvelope`](crate::task::TaskEnvelope)s inside
//! JSON requests.

pub mod client;
pub mod handlers;
pub mod protocol;

pub use client::HttpTransport;
