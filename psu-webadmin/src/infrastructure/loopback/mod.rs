//! Loopback transport: an in-process HTTP server for tests and the host
//! simulator.
//!
//! It models what the handlers rely on from the embedded server: one body
//! chunk buffered at a time, intake that holds until the handler releases
//! it, a bounded signal queue, a send buffer of one chunk, and clients that
//! hang up mid-request.

mod form;
mod server;
mod session;

pub use form::parse_urlencoded;
pub use server::{Exchange, LoopbackServer, Outcome};
pub use session::{LoopbackConfig, LoopbackSession, Response};
