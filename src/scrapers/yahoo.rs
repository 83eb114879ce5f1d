//! Yahoo Finance strategy.
//!
//! Yahoo serves three page shapes from one host:
//!
//! - topic streams (`/topic/latest-news/`): listing of teasers
//! - quote news feeds (`/quote/AAPL/news`, `?p=AAPL`): the same teaser markup,
//!   tagged with the quote's symbol
//! - story pages (`/news/{slug}.html`): a single article
//!
//! Stream teasers show relative times ("2 hours ago"), which are kept
//! verbatim by the normalizer.

use crate::classify::RouteSpec;
use crate::error::ConfigError;
use crate::extract::selector::ProbeSpec::{self, Attr, JoinedText, Text};
use crate::models::{PageKind, SourceId};
use crate::strategy::{FieldMap, LayoutSpec, SourceStrategy};

const STREAM_ITEMS: &[&str] = &[
    "li.js-stream-content",
    "li.stream-item",
    "section[data-testid='storyitem']",
];

const ITEM_TICKERS: &[ProbeSpec] = &[
    Text("a[data-testid='ticker-container'] span.symbol"),
    Text("a[data-testid='ticker-container']"),
    Text("div.taxonomy-links a"),
];

fn stream_layout() -> LayoutSpec {
    LayoutSpec::list(STREAM_ITEMS)
        .field("h3", &[Text("h3"), Text("a.subtle-link")])
        .field("link", &[Attr("h3 a", "href"), Attr("a.subtle-link", "href"), Attr("a", "href")])
        .field("blurb", &[Text("p")])
        .field("img", &[Attr("img", "src"), Attr("img", "data-src")])
        .field(
            "when",
            &[
                Attr("time[datetime]", "datetime"),
                Text("div.publishing span:last-child"),
                Text("div.publishing"),
            ],
        )
        .tickers(ITEM_TICKERS)
        .ceiling(15)
}

pub fn strategy() -> Result<SourceStrategy, ConfigError> {
    SourceStrategy::builder(SourceId::YAHOO, "Yahoo Finance", "https://finance.yahoo.com")
        .target("/topic/latest-news/")
        .route(RouteSpec::PathPattern(r"^/quote/[A-Za-z0-9.^=%-]+/news/?$", PageKind::TickerFeedItem))
        .route(RouteSpec::SymbolParam("p", PageKind::TickerFeedItem))
        .route(RouteSpec::PathPattern(r"^/news/[a-z0-9-]+\.html$", PageKind::FullArticle))
        .route(RouteSpec::PathPattern(r"^/m/[0-9a-f-]+/[a-z0-9-]+\.html$", PageKind::FullArticle))
        .route(RouteSpec::PathContains("/topic/", PageKind::ListingItem))
        .route(RouteSpec::Container("div.caas-body", PageKind::FullArticle))
        .layout(PageKind::ListingItem, stream_layout())
        .layout(
            PageKind::TickerFeedItem,
            stream_layout().page_tickers(&[
                Attr("fin-streamer[data-field='regularMarketPrice'][data-symbol]", "data-symbol"),
                Attr("[data-symbol]", "data-symbol"),
            ]),
        )
        .layout(
            PageKind::FullArticle,
            LayoutSpec::page()
                .field("h3", &[Text("div.caas-title-wrapper h1"), Text("h1")])
                .field(
                    "link",
                    &[
                        Attr("link[rel='canonical']", "href"),
                        Attr("meta[property='og:url']", "content"),
                    ],
                )
                .field("blurb", &[Attr("meta[name='description']", "content")])
                .field("img", &[Attr("meta[property='og:image']", "content")])
                .field("when", &[Attr("time[datetime]", "datetime")])
                .field("author", &[Text("div.caas-attr-item-author"), Text("div.byline-attr-author")])
                .field("body", &[JoinedText("div.caas-body p"), JoinedText("div.body p")])
                .tickers(&[
                    Text("div.caas-xray-pill-type-ticker span"),
                    Attr("fin-ticker[symbol]", "symbol"),
                    Text("a[data-testid='ticker-container']"),
                ]),
        )
        .fields(FieldMap {
            summary: Some("blurb"),
            published_at: Some("when"),
            image_url: Some("img"),
            author: Some("author"),
            content: Some("body"),
            ..FieldMap::required("h3", "link")
        })
        .default_category("finance")
        .follow_articles(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::normalize::normalize;
    use scraper::Html;

    #[test]
    fn routes_distinguish_three_page_shapes() {
        let s = strategy().unwrap();
        assert_eq!(
            s.classify_url("https://finance.yahoo.com/quote/AAPL/news"),
            PageKind::TickerFeedItem
        );
        assert_eq!(
            s.classify_url("https://finance.yahoo.com/quote?p=BRK-B"),
            PageKind::TickerFeedItem
        );
        assert_eq!(
            s.classify_url("https://finance.yahoo.com/news/fed-holds-rates-093000123.html"),
            PageKind::FullArticle
        );
        assert_eq!(
            s.classify_url("https://finance.yahoo.com/topic/latest-news/"),
            PageKind::ListingItem
        );
    }

    #[test]
    fn relative_time_is_preserved() {
        let s = strategy().unwrap();
        let dom = Html::parse_document(
            r#"<ul><li class="js-stream-content">
                 <h3><a href="/news/fed-holds-rates-093000123.html">Fed holds rates</a></h3>
                 <div class="publishing"><span>Reuters</span><span>2 hours ago</span></div>
               </li></ul>"#,
        );
        let raws = extract(&s, PageKind::ListingItem, &dom);
        let a = normalize(&s, PageKind::ListingItem, &raws[0]).unwrap();
        assert_eq!(a.published_at.as_deref(), Some("2 hours ago"));
        assert_eq!(
            a.url,
            "https://finance.yahoo.com/news/fed-holds-rates-093000123.html"
        );
    }

    #[test]
    fn ticker_feed_tags_items_with_page_symbol() {
        let s = strategy().unwrap();
        let dom = Html::parse_document(
            r#"<fin-streamer data-field="regularMarketPrice" data-symbol="AAPL">230.1</fin-streamer>
               <ul>
                 <li class="stream-item"><h3>iPhone sales beat</h3><a href="/news/iphone.html">x</a>
                   <a data-testid="ticker-container"><span class="symbol">MSFT</span></a>
                   <a data-testid="ticker-container"><span class="symbol">AAPL</span></a></li>
                 <li class="stream-item"><h3>Apple supplier news</h3><a href="/news/supplier.html">x</a></li>
               </ul>"#,
        );
        let kind = s.classify("https://finance.yahoo.com/quote/AAPL/news", &dom).kind;
        assert_eq!(kind, PageKind::TickerFeedItem);
        let raws = extract(&s, kind, &dom);
        assert_eq!(raws.len(), 2);
        let first = normalize(&s, kind, &raws[0]).unwrap();
        assert_eq!(first.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(first.kind, PageKind::TickerFeedItem);
        let second = normalize(&s, kind, &raws[1]).unwrap();
        assert_eq!(second.tickers, vec!["AAPL"]);
    }
}
