//! Financial Times strategy.
//!
//! Teasers on section pages use the Origami `o-teaser` component. Listing
//! teasers have no publish date, so only followed article pages fill
//! `publishedAt`.
//!
//! # URL Pattern
//!
//! Articles live at `https://www.ft.com/content/{uuid}`; everything else is
//! treated as a listing.

use crate::classify::RouteSpec;
use crate::error::ConfigError;
use crate::extract::selector::ProbeSpec::{Attr, JoinedText, Text};
use crate::models::{PageKind, SourceId};
use crate::strategy::{FieldMap, LayoutSpec, SourceStrategy};

pub fn strategy() -> Result<SourceStrategy, ConfigError> {
    SourceStrategy::builder(SourceId::FT, "Financial Times", "https://www.ft.com")
        .target("/markets")
        .route(RouteSpec::PathPattern(
            r"^/content/[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
            PageKind::FullArticle,
        ))
        .route(RouteSpec::Container("div.article__content-body", PageKind::FullArticle))
        .layout(
            PageKind::ListingItem,
            LayoutSpec::list(&["div.o-teaser", "li.o-teaser-collection__item"])
                .field(
                    "heading",
                    &[Text("div.o-teaser__heading a"), Text(".o-teaser__heading")],
                )
                .field(
                    "href",
                    &[
                        Attr("div.o-teaser__heading a", "href"),
                        Attr("a.js-teaser-heading-link", "href"),
                    ],
                )
                .field("standfirst", &[Text("div.o-teaser__standfirst"), Text("p.o-teaser__standfirst")])
                .field("teaser_image", &[Attr("img", "src"), Attr("img", "data-src")])
                .field("tag", &[Text("a.o-teaser__tag"), Text(".o-teaser__tag")])
                .field("timestamp", &[Attr("time.o-teaser__timestamp-date", "datetime"), Attr("time", "datetime")])
                .ceiling(10),
        )
        .layout(
            PageKind::FullArticle,
            LayoutSpec::page()
                .field("heading", &[Text("h1.o-topper__headline"), Text("h1")])
                .field(
                    "href",
                    &[
                        Attr("link[rel='canonical']", "href"),
                        Attr("meta[property='og:url']", "content"),
                    ],
                )
                .field("standfirst", &[Text("div.o-topper__standfirst"), Attr("meta[name='description']", "content")])
                .field("teaser_image", &[Attr("meta[property='og:image']", "content")])
                .field("tag", &[Text("a.o-topper__topic"), Text(".o-topper__tags a")])
                .field("timestamp", &[Attr("time[datetime]", "datetime"), Attr("meta[property='article:published_time']", "content")])
                .field("byline", &[Text("a.n-content-tag--author"), Text(".o3-editorial-typography-byline-author")])
                .field("body", &[JoinedText("div.article__content-body p"), JoinedText("article#article-body p")]),
        )
        .fields(FieldMap {
            summary: Some("standfirst"),
            published_at: Some("timestamp"),
            image_url: Some("teaser_image"),
            category: Some("tag"),
            author: Some("byline"),
            content: Some("body"),
            ..FieldMap::required("heading", "href")
        })
        .default_category("markets")
        .follow_articles(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::normalize::normalize;
    use scraper::Html;

    const MARKETS: &str = r#"
        <div class="o-teaser">
          <div class="o-teaser__meta"><a class="o-teaser__tag">Equities</a></div>
          <div class="o-teaser__heading"><a href="/content/0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b">Stocks rally</a></div>
          <div class="o-teaser__standfirst">Tech leads gains</div>
          <img src="https://images.ft.com/1.jpg">
        </div>
        <div class="o-teaser">
          <div class="o-teaser__heading"><a href="/content/11111111-2222-3333-4444-555555555555">Bonds slide</a></div>
        </div>"#;

    #[test]
    fn listing_teasers_normalize() {
        let s = strategy().unwrap();
        let dom = Html::parse_document(MARKETS);
        let kind = s.classify("https://www.ft.com/markets", &dom).kind;
        assert_eq!(kind, PageKind::ListingItem);

        let articles: Vec<_> = extract(&s, kind, &dom)
            .iter()
            .filter_map(|r| normalize(&s, kind, r).ok())
            .collect();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].title, "Stocks rally");
        assert_eq!(
            articles[0].url,
            "https://www.ft.com/content/0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b"
        );
        assert_eq!(articles[0].category, "Equities");
        assert_eq!(articles[0].summary, "Tech leads gains");
        assert_eq!(articles[1].category, "markets");
        assert_eq!(articles[1].published_at, None);
    }

    #[test]
    fn article_urls_classify_as_full_articles() {
        let s = strategy().unwrap();
        assert_eq!(
            s.classify_url("https://www.ft.com/content/0f1e2d3c-4b5a-6978-8a9b-0c1d2e3f4a5b"),
            PageKind::FullArticle
        );
        assert_eq!(s.classify_url("https://www.ft.com/companies"), PageKind::ListingItem);
    }

    #[test]
    fn article_page_reads_body_and_byline() {
        let s = strategy().unwrap();
        let dom = Html::parse_document(
            r#"<html><head>
                 <link rel="canonical" href="https://www.ft.com/content/11111111-2222-3333-4444-555555555555">
               </head><body>
                 <h1 class="o-topper__headline">Bonds slide</h1>
                 <a class="n-content-tag--author">Jane Doe</a>
                 <time datetime="2026-10-16T07:15:00.000Z">October 16 2026</time>
                 <div class="article__content-body"><p>Yields rose.</p><p>Again.</p></div>
               </body></html>"#,
        );
        let raws = extract(&s, PageKind::FullArticle, &dom);
        let a = normalize(&s, PageKind::FullArticle, &raws[0]).unwrap();
        assert_eq!(a.author.as_deref(), Some("Jane Doe"));
        assert_eq!(a.content, "Yields rose. Again.");
        assert_eq!(a.published_at.as_deref(), Some("2026-10-16T07:15:00Z"));
        assert_eq!(a.kind, PageKind::FullArticle);
    }
}
