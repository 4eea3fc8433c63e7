//! Signed S3-compatible storage stack.
//!
//! Layered bottom-up: key sanitizer, SigV4 signer, HTTP transport, XML
//! response parsers, and the `StorageClient` facade on top.

pub mod client;
pub mod keys;
pub mod signer;
pub mod types;

pub(crate) mod transport;
pub(crate) mod xml;

pub use client::StorageClient;
