mod client;
mod disabled;
mod wire;

pub use client::BackendClient;
pub use disabled::DisabledImageSearch;
