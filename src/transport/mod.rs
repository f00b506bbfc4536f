//! transport seam between the sync client and the agent
//!
//! fetching over the network is left to integrators; this module defines
//! the request and response documents and a replay transport.

pub mod local;
pub mod request;
pub mod response;

pub use local::ReplayTransport;
pub use request::{ClientPayload, ClientState, ClientTracer, Payload};
pub use response::{Response, TargetFile};

use crate::error::Result;

/// sends the client state and returns the agent's answer
pub trait Transport {
    fn send_config(&mut self, payload: &Payload) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_config(&mut self, payload: &Payload) -> Result<Response> {
        (**self).send_config(payload)
    }
}
