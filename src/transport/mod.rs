//! HTTP transport shared by the remote model clients.

mod http;

pub use http::{HttpTransport, TransportError};
