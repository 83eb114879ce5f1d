//! Page classification: decide which extraction routine a fetched page needs.
//!
//! Each source declares an ordered list of [`Route`]s. The first route that
//! matches decides the [`PageKind`]; when none does the page is treated as a
//! listing, since an empty list extraction is harmless while reading a list
//! page as a single article is not. Classification never fails: a url that
//! cannot be inspected falls back to the default and carries a warning.

use crate::error::ConfigError;
use crate::extract::selector::css;
use crate::models::{PageKind, SourceId};
use crate::registry::SourceRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Query values that look like an instrument symbol (`AAPL`, `BRK-B`, `^DJI`).
static SYMBOL_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9.^=-]{1,12}$").unwrap());

/// Declarative form of a [`Route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSpec {
    /// Regex matched against the url path.
    PathPattern(&'static str, PageKind),
    /// Plain substring of the url path, e.g. a section keyword.
    PathContains(&'static str, PageKind),
    /// Query parameter carrying a ticker symbol.
    SymbolParam(&'static str, PageKind),
    /// Page contains an element matching the selector.
    Container(&'static str, PageKind),
}

/// Compiled classifier predicate.
#[derive(Debug, Clone)]
pub enum Route {
    PathPattern(Regex, PageKind),
    PathContains(&'static str, PageKind),
    SymbolParam(&'static str, PageKind),
    Container(Selector, PageKind),
}

impl Route {
    pub fn compile(spec: RouteSpec) -> Result<Self, ConfigError> {
        Ok(match spec {
            RouteSpec::PathPattern(p, kind) => {
                let re = Regex::new(p).map_err(|e| ConfigError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })?;
                Route::PathPattern(re, kind)
            }
            RouteSpec::PathContains(s, kind) => Route::PathContains(s, kind),
            RouteSpec::SymbolParam(name, kind) => Route::SymbolParam(name, kind),
            RouteSpec::Container(sel, kind) => Route::Container(css(sel)?, kind),
        })
    }

    pub fn kind(&self) -> PageKind {
        match self {
            Route::PathPattern(_, k)
            | Route::PathContains(_, k)
            | Route::SymbolParam(_, k)
            | Route::Container(_, k) => *k,
        }
    }

    fn matches(&self, url: &Url, dom: Option<&Html>) -> bool {
        match self {
            Route::PathPattern(re, _) => re.is_match(url.path()),
            Route::PathContains(s, _) => url.path().contains(s),
            Route::SymbolParam(name, _) => url
                .query_pairs()
                .any(|(k, v)| k == *name && SYMBOL_VALUE.is_match(&v)),
            Route::Container(sel, _) => dom.is_some_and(|d| d.select(sel).next().is_some()),
        }
    }
}

/// Outcome of classifying one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: PageKind,
    /// Set when classification degraded to the default because of a fault.
    pub warning: Option<String>,
}

impl Classification {
    fn fallback(warning: Option<String>) -> Self {
        Classification {
            kind: PageKind::ListingItem,
            warning,
        }
    }
}

/// Classify a page against an ordered route list.
///
/// Passing `None` for `dom` evaluates url-based routes only, which is how
/// discovered links are judged before they are fetched.
pub fn classify_page(routes: &[Route], url: &str, dom: Option<&Html>) -> Classification {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            let msg = format!("cannot classify `{url}`: {e}; treating as listing");
            warn!(%url, error = %e, "Classifier fell back to listing");
            return Classification::fallback(Some(msg));
        }
    };
    match routes.iter().find(|r| r.matches(&parsed, dom)) {
        Some(route) => Classification {
            kind: route.kind(),
            warning: None,
        },
        None => {
            debug!(%url, "No route matched; defaulting to listing");
            Classification::fallback(None)
        }
    }
}

/// Classify a page for a registered source.
pub fn classify(registry: &SourceRegistry, source: &SourceId, url: &str, dom: &Html) -> Classification {
    match registry.get(source) {
        Ok(strategy) => classify_page(strategy.routes(), url, Some(dom)),
        Err(e) => {
            warn!(%source, %url, "Classifier asked about an unknown source");
            Classification::fallback(Some(e.to_string()))
        }
    }
}
