//! # docsearch core
//!
//! Pure logic for docsearch: data models, the overlapping text chunker,
//! the dot-product similarity ranker, and the [`store::DocumentStore`] and
//! [`embedding::Embedder`] traits that the application implements.
//!
//! This crate performs no I/O.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod models;
pub mod rank;
pub mod store;

pub use error::CoreError;
