//! # Host Bridge Traits
//!
//! The boundary between the media engine and its host environment.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - async HTTP with range requests, used to back
//!   the networked `IoSource`.
//! - [`Clock`](time::Clock) - time source for deterministic testing.
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to a host sink.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError) for consistent error
//! handling across implementations.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` to support safe concurrent usage across
//! the decoder worker thread and the async HTTP layer.

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
