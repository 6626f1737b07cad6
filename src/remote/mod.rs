//! Remote platform interface and implementations.

pub mod http;
pub mod memory;
pub mod platform;

pub use http::HttpPlatform;
pub use memory::MemoryPlatform;
pub use platform::{RemoteImageState, RemotePlatform};
