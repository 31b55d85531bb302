//! Upstream fetching for proxied routes

pub mod upstream;

pub use upstream::{Upstream, UpstreamResponse};
