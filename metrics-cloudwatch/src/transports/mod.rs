//! The provided clients.
//!
//! This module exposes the HTTP client that is compiled into the library
//! when the `reqwest` feature is enabled (part of the default `transport`
//! feature).

#[cfg(feature = "reqwest")]
mod reqwest;
#[cfg(feature = "reqwest")]
pub use self::reqwest::{HttpClient, HttpClientOptions};
