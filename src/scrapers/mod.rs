//! Built-in source strategies.
//!
//! Each submodule declares one site's markup as a [`SourceStrategy`]: the
//! pages to start from, how to tell listings, articles and ticker feeds
//! apart, and an ordered selector chain for every field.
//!
//! # Supported Sources
//!
//! | Source | Module | Start page | Follows articles | Notes |
//! |--------|--------|------------|------------------|-------|
//! | Financial Times | [`ft`] | `/markets` | yes | Teasers carry no date |
//! | Bloomberg | [`bloomberg`] | `/markets` | no | Article bodies are paywalled |
//! | Yahoo Finance | [`yahoo`] | `/topic/latest-news/` | yes | Also ticker feeds under `/quote/{SYM}/news` |
//! | Reuters | [`reuters`] | `/business/finance/` | yes | Dates are `<time datetime>` |
//!
//! # Adding a Source
//!
//! Write a module exposing `strategy()` and add it to [`builtin`]. The
//! orchestrator, extractor and normalizer need no changes.

pub mod bloomberg;
pub mod ft;
pub mod reuters;
pub mod yahoo;

use crate::error::ConfigError;
use crate::strategy::SourceStrategy;

/// Compile every built-in strategy.
pub fn builtin() -> Result<Vec<SourceStrategy>, ConfigError> {
    Ok(vec![
        ft::strategy()?,
        bloomberg::strategy()?,
        yahoo::strategy()?,
        reuters::strategy()?,
    ])
}
