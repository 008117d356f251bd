#![deny(missing_docs)]

//! Core library for the pagechat document Q&A server.

/// HTTP routing and REST handlers.
pub mod api;
/// Page citation extraction.
pub mod citations;
/// HTTP client for a running server.
pub mod client;
/// Environment-driven configuration management.
pub mod config;
/// Document chunking and relevance-based context selection.
pub mod context;
/// Text generation backends.
pub mod generation;
/// Structured logging and tracing setup.
pub mod logging;
/// Answer pipeline metrics helpers.
pub mod metrics;
/// Streaming answer pipeline.
pub mod pipeline;
/// Document, session, and message persistence.
pub mod storage;
/// Frame encoding and decoding for streamed answers.
pub mod transport;
