//! Authenticated HTTP transport.
//!
//! Every request to the dashboard API goes through [`AuthenticatedTransport`],
//! which attaches the session's bearer token and cookies and turns non-2xx
//! responses into a [`TransportError`].

mod client;
mod error;
mod request;

pub use client::AuthenticatedTransport;
pub use error::TransportError;
pub use request::{ApiRequest, ResponseBody};
