//! # Grant Beacon
//!
//! A grant-discovery assistant: given a researcher's name and affiliation it
//! synthesizes a profile, extracts search keywords, fans out one grant search
//! per keyword, deduplicates and ranks the hits, and returns everything in a
//! single envelope for a browser client.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────────┐   ┌───────┐   ┌──────┐
//! │ Profile  │──▶│ Keywords │──▶│ Search fan-out│──▶│ Dedup │──▶│ Rank │
//! │ (search) │   │  (chat)  │   │  (grants API) │   └───────┘   │(chat)│
//! └──────────┘   └──────────┘   └───────────────┘               └──┬───┘
//!                                                                   ▼
//!                                            ┌──────────────────────────┐
//!                                            │ {status, errors, data}   │
//!                                            │  CLI (beacon) / HTTP     │
//!                                            └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! beacon check                                   # credential status
//! beacon run --name "Jane Doe" --affiliation "Acme University"
//! beacon serve                                   # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credentials |
//! | [`error`] | Upstream errors and the run issue taxonomy |
//! | [`models`] | Request and grant types |
//! | [`llm`] | Chat-completion client |
//! | [`grants`] | Grants-opportunity search client |
//! | [`profile`] | Profile synthesis |
//! | [`keywords`] | Keyword extraction |
//! | [`fanout`] | Concurrent per-keyword search |
//! | [`dedup`] | Identifier-based deduplication |
//! | [`rank`] | Relevance ranking |
//! | [`ideation`] | Talking points |
//! | [`report`] | Run status and response envelope |
//! | [`pipeline`] | Stage orchestration |
//! | [`assist`] | Section drafting assistance |
//! | [`server`] | HTTP server |

pub mod assist;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fanout;
pub mod grants;
pub mod ideation;
pub mod keywords;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod rank;
pub mod report;
pub mod server;
