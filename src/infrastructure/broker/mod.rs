pub mod client;
pub mod rate_limiter;
pub mod requests;
pub mod token_cache;

pub use client::KisBrokerClient;
