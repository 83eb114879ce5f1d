//! Output sinks for ingested articles.
//!
//! - [`json`]: [`JsonStore`](json::JsonStore), dated JSON files
//!
//! Relational persistence lives outside this crate; it plugs in through the
//! [`ArticleStore`](crate::store::ArticleStore) trait.

pub mod json;
