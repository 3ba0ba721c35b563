//! # docqa
//!
//! Question answering over a local folder of PDF and TXT documents.
//!
//! Documents are fingerprinted, chunked, embedded and stored in a vector
//! collection. Questions are answered by retrieving the closest chunks,
//! falling back to typo-tolerant lexical matching when the semantic hits
//! are weak, and handing them to a language model with strict grounding
//! instructions. Every answer ends with the files it drew from.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────────────┐   ┌──────────────┐
//! │ documents │──▶│ indexer                  │──▶│ vector store │
//! │ *.pdf/txt │   │ fingerprint→chunk→embed  │   │ SQLite       │
//! └───────────┘   └──────────────────────────┘   └──────┬───────┘
//!                                                       │
//!                     ┌─────────────────────────────────┘
//!                     ▼
//!              ┌─────────────┐   ┌──────────┐   ┌───────────┐
//!  question ──▶│ search      │──▶│ answer   │──▶│ generator │
//!              │ (+ fuzzy)   │   │ assembly │   │ Gemini…   │
//!              └─────────────┘   └──────────┘   └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping fixed-size chunking |
//! | [`extract`] | PDF / TXT text extraction |
//! | [`scan`] | Documents folder listing |
//! | [`fingerprint`] | Content hashing and change detection |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait and backends |
//! | [`indexer`] | Incremental indexing |
//! | [`search`] | Semantic search with fallback |
//! | [`fuzzy`] | Lexical fallback matcher |
//! | [`generate`] | Language model backends |
//! | [`answer`] | Prompt assembly and source attribution |
//! | [`service`] | Wiring of all of the above |
//! | [`status`] | Index status overview |
//! | [`progress`] | Indexing progress reporters |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod fingerprint;
pub mod fuzzy;
pub mod generate;
pub mod indexer;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod scan;
pub mod search;
pub mod service;
pub mod status;
pub mod store;
