//! Field extraction from an already-fetched page.
//!
//! Extraction is pure and infallible: every field read goes through a
//! [`SelectorChain`](selector::SelectorChain) that returns `Option`, so a
//! missing or renamed node only makes that one field absent. List pages are
//! capped at the layout's item ceiling; items past the ceiling are dropped.

pub mod selector;

use crate::models::{PageKind, RawExtraction};
use crate::strategy::{Layout, SourceStrategy};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

/// Short all-caps tokens, optionally with a share class suffix (`BRK.B`).
static TICKER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{1,5}(?:\.[A-Z]{1,2})?\b").unwrap());

/// Extract raw records from `dom` using the strategy's layout for `kind`.
///
/// Returns one record per item on list pages and a single record on article
/// pages. A source with no layout for `kind` yields nothing.
pub fn extract(strategy: &SourceStrategy, kind: PageKind, dom: &Html) -> Vec<RawExtraction> {
    let ceiling = strategy.layout(kind).map_or(0, |l| l.item_ceiling);
    extract_capped(strategy, kind, dom, ceiling)
}

/// Like [`extract`] but with an explicit list ceiling.
pub fn extract_capped(
    strategy: &SourceStrategy,
    kind: PageKind,
    dom: &Html,
    ceiling: usize,
) -> Vec<RawExtraction> {
    let Some(layout) = strategy.layout(kind) else {
        debug!(source = %strategy.id(), ?kind, "No layout for page kind");
        return Vec::new();
    };
    let root = dom.root_element();
    let page_tickers = ticker_tokens(layout.page_tickers.all(root));

    match &layout.items {
        Some(items) => {
            let nodes = items.select(root);
            if nodes.len() > ceiling {
                debug!(
                    source = %strategy.id(),
                    found = nodes.len(),
                    ceiling,
                    "List larger than ceiling; dropping the rest"
                );
            }
            nodes
                .into_iter()
                .take(ceiling)
                .map(|node| read_record(layout, node, &page_tickers))
                .collect()
        }
        None => vec![read_record(layout, root, &page_tickers)],
    }
}

fn read_record(layout: &Layout, node: ElementRef<'_>, page_tickers: &[String]) -> RawExtraction {
    let mut raw = RawExtraction::default();
    for rule in &layout.fields {
        if let Some(value) = rule.chain.first(node) {
            raw.insert(rule.name, value);
        }
    }
    let own = ticker_tokens(layout.tickers.all(node));
    raw.tickers = page_tickers
        .iter()
        .cloned()
        .chain(own)
        .unique()
        .collect();
    raw
}

/// Ticker-like tokens from container texts, first-seen order, no repeats.
pub fn ticker_tokens<I, S>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for text in texts {
        for m in TICKER_TOKEN.find_iter(text.as_ref()) {
            let token = m.as_str();
            if !out.iter().any(|t| t == token) {
                out.push(token.to_string());
            }
        }
    }
    out
}
