//! Backend module.

mod forwarder;
mod registry;
mod resolver;

pub use forwarder::HttpForwarder;
pub use registry::InMemoryBackendRegistry;
pub use resolver::{BackendResolver, DnsResolver, StaticResolver};
