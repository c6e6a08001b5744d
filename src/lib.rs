//! # docsearch
//!
//! Upload text and PDF documents, embed their chunks, and search them by
//! semantic similarity.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────┐   ┌──────────┐
//! │  Upload  │──▶│ Extract→Chunk→Embed  │──▶│  SQLite  │
//! │ txt/pdf  │   │   (docsearch-core)   │   │ + BLOBs  │
//! └──────────┘   └──────────────────────┘   └────┬─────┘
//!                                                │
//!                        ┌───────────────────────┤
//!                        ▼                       ▼
//!                   ┌──────────┐           ┌──────────┐
//!                   │   CLI    │           │   HTTP   │
//!                   └──────────┘           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsearch init
//! docsearch credentials set openai_api_key sk-...
//! docsearch upload report.pdf notes.txt
//! docsearch search "quarterly revenue" --limit 3
//! docsearch serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`logs`] | Filtering and counting the daily log files |
//! | [`db`] / [`migrate`] | Database connection and schema |
//! | [`sqlite_store`] | SQLite document store |
//! | [`extract`] | Text extraction and cleaning |
//! | [`embedding`] | OpenAI embedder and concurrent chunk embedding |
//! | [`credentials`] | Encrypted credential store |
//! | [`service`] | Upload and search pipelines |
//! | [`library`] | Library filtering, sorting and summaries |
//! | [`server`] | JSON HTTP API |

pub mod config;
pub mod credentials;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod get;
pub mod library;
pub mod logging;
pub mod logs;
pub mod migrate;
pub mod progress;
pub mod search;
pub mod server;
pub mod service;
pub mod sqlite_store;
pub mod stats;
