#![forbid(unsafe_code)]

mod http;
mod transport;

pub use http::HttpTransport;
pub use transport::{CounterAction, Transport};
