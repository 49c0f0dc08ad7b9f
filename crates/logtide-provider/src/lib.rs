//! Log provider API client for logtide
//!
//! This crate talks to the backend that links a cloud log provider to the
//! current user and reports which provider, if any, is linked.

mod client;
mod error;

pub use client::{ConnectRequest, ProviderApi, ProviderClient};
pub use error::{ProviderError, Result};

// Re-export types that are used in our public API
pub use logtide_types::{ProviderContext, ProviderKind};
