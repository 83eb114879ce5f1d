//! # finwire
//!
//! Scrapes financial news sites whose markup has nothing in common and
//! reduces what it finds to one normalized article record.
//!
//! ## Architecture
//!
//! 1. **Strategies** ([`scrapers`], [`strategy`], [`registry`]): each source
//!    declares its start pages, page routes and per-field selector chains
//! 2. **Classification** ([`classify`]): decide whether a page is a listing,
//!    a single article or a ticker feed
//! 3. **Extraction** ([`extract`]): read raw, source-shaped fields; missing
//!    markup only makes a field absent
//! 4. **Normalization** ([`normalize`]): map onto [`CanonicalArticle`] or
//!    reject
//! 5. **Orchestration** ([`orchestrator`], [`scheduler`]): run every source in
//!    isolation on a cadence and hand the batch to an [`ArticleStore`]
//!
//! [`CanonicalArticle`]: models::CanonicalArticle
//! [`ArticleStore`]: store::ArticleStore

pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod outputs;
pub mod registry;
pub mod scheduler;
pub mod scrapers;
pub mod store;
pub mod strategy;
pub mod utils;
