//! Per-source extraction strategies.
//!
//! A [`SourceStrategy`] bundles everything that differs between sites:
//! where to start crawling, how to classify pages, which selectors read each
//! field on each kind of page, and how the source's field names map onto the
//! canonical schema. Strategies are declared with [`StrategyBuilder`] using
//! plain `&'static str` selectors and compiled once at startup; after that
//! they are immutable and shared read-only between concurrent runs.

use crate::classify::{Classification, Route, RouteSpec, classify_page};
use crate::error::ConfigError;
use crate::extract::selector::{ContainerChain, ProbeSpec, SelectorChain};
use crate::models::{PageKind, SourceId};
use scraper::Html;
use std::collections::HashMap;
use url::Url;

/// Items read from one list page unless a strategy says otherwise.
pub const DEFAULT_ITEM_CEILING: usize = 10;

/// One source field and the selector chain that reads it.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pub chain: SelectorChain,
}

/// Compiled extraction layout for one page kind.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Repeated item blocks; `None` means the whole page is one record.
    pub items: Option<ContainerChain>,
    pub fields: Vec<FieldRule>,
    /// Ticker containers inside each record.
    pub tickers: SelectorChain,
    /// Ticker containers that apply to every record on the page.
    pub page_tickers: SelectorChain,
    pub item_ceiling: usize,
}

impl Layout {
    /// Field names this layout can produce.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

/// Declarative form of a [`Layout`].
#[derive(Debug, Clone, Default)]
pub struct LayoutSpec {
    items: Option<Vec<&'static str>>,
    fields: Vec<(&'static str, Vec<ProbeSpec>)>,
    tickers: Vec<ProbeSpec>,
    page_tickers: Vec<ProbeSpec>,
    item_ceiling: Option<usize>,
}

impl LayoutSpec {
    /// Layout for pages holding repeated item blocks.
    pub fn list(item_selectors: &[&'static str]) -> Self {
        LayoutSpec {
            items: Some(item_selectors.to_vec()),
            ..Default::default()
        }
    }

    /// Layout for pages that are a single record.
    pub fn page() -> Self {
        LayoutSpec::default()
    }

    pub fn field(mut self, name: &'static str, probes: &[ProbeSpec]) -> Self {
        self.fields.push((name, probes.to_vec()));
        self
    }

    pub fn tickers(mut self, probes: &[ProbeSpec]) -> Self {
        self.tickers = probes.to_vec();
        self
    }

    pub fn page_tickers(mut self, probes: &[ProbeSpec]) -> Self {
        self.page_tickers = probes.to_vec();
        self
    }

    pub fn ceiling(mut self, n: usize) -> Self {
        self.item_ceiling = Some(n);
        self
    }

    fn compile(self) -> Result<Layout, ConfigError> {
        let items = self.items.as_deref().map(ContainerChain::compile).transpose()?;
        let fields = self
            .fields
            .into_iter()
            .map(|(name, probes)| {
                Ok(FieldRule {
                    name,
                    chain: SelectorChain::compile(&probes)?,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Layout {
            items,
            fields,
            tickers: SelectorChain::compile(&self.tickers)?,
            page_tickers: SelectorChain::compile(&self.page_tickers)?,
            item_ceiling: self.item_ceiling.unwrap_or(DEFAULT_ITEM_CEILING),
        })
    }
}

/// Which source field feeds each canonical field.
///
/// `title` and `url` are mandatory in the canonical schema, so they always
/// name a source field; the rest are optional because some sources never
/// publish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub title: &'static str,
    pub url: &'static str,
    pub summary: Option<&'static str>,
    pub published_at: Option<&'static str>,
    pub image_url: Option<&'static str>,
    pub category: Option<&'static str>,
    pub author: Option<&'static str>,
    pub content: Option<&'static str>,
}

impl FieldMap {
    pub const fn required(title: &'static str, url: &'static str) -> Self {
        FieldMap {
            title,
            url,
            summary: None,
            published_at: None,
            image_url: None,
            category: None,
            author: None,
            content: None,
        }
    }
}

/// Immutable extraction configuration for one source.
#[derive(Debug, Clone)]
pub struct SourceStrategy {
    id: SourceId,
    display_name: &'static str,
    base_url: Url,
    targets: Vec<Url>,
    routes: Vec<Route>,
    layouts: HashMap<PageKind, Layout>,
    fields: FieldMap,
    default_category: &'static str,
    follow_articles: bool,
}

impl SourceStrategy {
    pub fn builder(id: SourceId, display_name: &'static str, base_url: &'static str) -> StrategyBuilder {
        StrategyBuilder {
            id,
            display_name,
            base_url,
            targets: Vec::new(),
            routes: Vec::new(),
            layouts: Vec::new(),
            fields: FieldMap::required("title", "url"),
            default_category: "",
            follow_articles: false,
        }
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Pages fetched at the start of every run.
    pub fn targets(&self) -> &[Url] {
        &self.targets
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn layout(&self, kind: PageKind) -> Option<&Layout> {
        self.layouts.get(&kind)
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.fields
    }

    pub fn default_category(&self) -> &'static str {
        self.default_category
    }

    /// Whether article links found on list pages are fetched too.
    pub fn follows_articles(&self) -> bool {
        self.follow_articles
    }

    pub fn classify(&self, url: &str, dom: &Html) -> Classification {
        classify_page(&self.routes, url, Some(dom))
    }

    /// Url-only classification, used for links that have not been fetched.
    pub fn classify_url(&self, url: &str) -> PageKind {
        classify_page(&self.routes, url, None).kind
    }
}

/// Collects a strategy declaration and compiles it in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct StrategyBuilder {
    id: SourceId,
    display_name: &'static str,
    base_url: &'static str,
    targets: Vec<&'static str>,
    routes: Vec<RouteSpec>,
    layouts: Vec<(PageKind, LayoutSpec)>,
    fields: FieldMap,
    default_category: &'static str,
    follow_articles: bool,
}

impl StrategyBuilder {
    /// A page fetched at the start of every run; relative to the base url.
    pub fn target(mut self, url: &'static str) -> Self {
        self.targets.push(url);
        self
    }

    /// Append a classifier route; earlier routes take precedence.
    pub fn route(mut self, route: RouteSpec) -> Self {
        self.routes.push(route);
        self
    }

    pub fn layout(mut self, kind: PageKind, spec: LayoutSpec) -> Self {
        self.layouts.push((kind, spec));
        self
    }

    pub fn fields(mut self, fields: FieldMap) -> Self {
        self.fields = fields;
        self
    }

    pub fn default_category(mut self, category: &'static str) -> Self {
        self.default_category = category;
        self
    }

    pub fn follow_articles(mut self, follow: bool) -> Self {
        self.follow_articles = follow;
        self
    }

    pub fn build(self) -> Result<SourceStrategy, ConfigError> {
        let base_url = Url::parse(self.base_url).map_err(|e| ConfigError::InvalidUrl {
            url: self.base_url.to_string(),
            reason: e.to_string(),
        })?;
        let targets = self
            .targets
            .iter()
            .map(|t| {
                base_url.join(t).map_err(|e| ConfigError::InvalidUrl {
                    url: t.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let routes = self
            .routes
            .into_iter()
            .map(Route::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let mut layouts = HashMap::new();
        for (kind, spec) in self.layouts {
            layouts.insert(kind, spec.compile()?);
        }
        Ok(SourceStrategy {
            id: self.id,
            display_name: self.display_name,
            base_url,
            targets,
            routes,
            layouts,
            fields: self.fields,
            default_category: self.default_category,
            follow_articles: self.follow_articles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::selector::ProbeSpec::{Attr, Text};

    #[test]
    fn builder_compiles_targets_relative_to_base() {
        let s = SourceStrategy::builder(SourceId::new("demo"), "Demo", "https://news.example.com")
            .target("/markets")
            .target("https://other.example.com/feed")
            .layout(
                PageKind::ListingItem,
                LayoutSpec::list(&["li.story"])
                    .field("headline", &[Text("h3")])
                    .field("link", &[Attr("a", "href")]),
            )
            .fields(FieldMap::required("headline", "link"))
            .build()
            .unwrap();

        let targets: Vec<&str> = s.targets().iter().map(Url::as_str).collect();
        assert_eq!(
            targets,
            vec!["https://news.example.com/markets", "https://other.example.com/feed"]
        );
        let layout = s.layout(PageKind::ListingItem).unwrap();
        assert_eq!(layout.item_ceiling, DEFAULT_ITEM_CEILING);
        assert_eq!(layout.field_names().collect::<Vec<_>>(), vec!["headline", "link"]);
        assert!(s.layout(PageKind::FullArticle).is_none());
    }

    #[test]
    fn builder_rejects_bad_base_url() {
        let err = SourceStrategy::builder(SourceId::new("demo"), "Demo", "not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn classify_url_uses_routes_only() {
        let s = SourceStrategy::builder(SourceId::new("demo"), "Demo", "https://news.example.com")
            .route(RouteSpec::PathPattern(r"^/story/\d+$", PageKind::FullArticle))
            .route(RouteSpec::Container("article", PageKind::FullArticle))
            .build()
            .unwrap();
        assert_eq!(s.classify_url("https://news.example.com/story/42"), PageKind::FullArticle);
        assert_eq!(s.classify_url("https://news.example.com/markets"), PageKind::ListingItem);
    }
}
