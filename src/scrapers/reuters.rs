//! Reuters strategy.
//!
//! Section pages render story cards with `data-testid` hooks, which change
//! less often than the generated class names, so they lead every chain.
//!
//! # URL Pattern
//!
//! Story urls end with the publication date:
//! `https://www.reuters.com/business/finance/some-slug-2026-10-16/`.

use crate::classify::RouteSpec;
use crate::error::ConfigError;
use crate::extract::selector::ProbeSpec::{Attr, JoinedText, Text};
use crate::models::{PageKind, SourceId};
use crate::strategy::{FieldMap, LayoutSpec, SourceStrategy};

pub fn strategy() -> Result<SourceStrategy, ConfigError> {
    SourceStrategy::builder(SourceId::REUTERS, "Reuters", "https://www.reuters.com")
        .target("/business/finance/")
        .route(RouteSpec::PathPattern(r"-\d{4}-\d{2}-\d{2}/?$", PageKind::FullArticle))
        .route(RouteSpec::Container("div[data-testid='ArticleBody']", PageKind::FullArticle))
        .layout(
            PageKind::ListingItem,
            LayoutSpec::list(&[
                "li[class*='story-collection__story']",
                "div[data-testid='MediaStoryCard']",
                "div[data-testid='TextStoryCard']",
            ])
            .field(
                "heading",
                &[
                    Text("[data-testid='Heading']"),
                    Text("a[data-testid='Title'] span"),
                    Text("h3"),
                ],
            )
            .field(
                "target",
                &[Attr("a[data-testid='Title']", "href"), Attr("a[data-testid='Heading']", "href"), Attr("a[href]", "href")],
            )
            .field("description", &[Text("p[data-testid='Description']")])
            .field("label", &[Text("span[data-testid='Label']"), Text("a[data-testid='Label']")])
            .field("time", &[Attr("time[datetime]", "datetime"), Text("time")])
            .field("thumbnail", &[Attr("img", "src")])
            .ceiling(20),
        )
        .layout(
            PageKind::FullArticle,
            LayoutSpec::page()
                .field("heading", &[Text("h1[data-testid='Heading']"), Text("h1")])
                .field(
                    "target",
                    &[
                        Attr("link[rel='canonical']", "href"),
                        Attr("meta[property='og:url']", "content"),
                    ],
                )
                .field("description", &[Attr("meta[name='description']", "content")])
                .field("label", &[Text("nav[aria-label='Tags'] a"), Attr("meta[property='article:section']", "content")])
                .field("time", &[Attr("time[datetime]", "datetime"), Attr("meta[property='article:published_time']", "content")])
                .field("thumbnail", &[Attr("meta[property='og:image']", "content")])
                .field("authors", &[Text("[data-testid='AuthorName']"), Text("a[rel='author']")])
                .field(
                    "paragraphs",
                    &[JoinedText("div[data-testid^='paragraph-']"), JoinedText("article p")],
                ),
        )
        .fields(FieldMap {
            summary: Some("description"),
            published_at: Some("time"),
            image_url: Some("thumbnail"),
            category: Some("label"),
            author: Some("authors"),
            content: Some("paragraphs"),
            ..FieldMap::required("heading", "target")
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
    fn story_cards_normalize() {
        let s = strategy().unwrap();
        let dom = Html::parse_document(
            r#"<ul>
                 <li class="story-collection__story__LeZ29">
                   <div data-testid="MediaStoryCard">
                     <span data-testid="Label">Banks</span>
                     <a data-testid="Heading" href="/business/finance/banks-rally-2026-10-16/">Banks rally</a>
                     <time datetime="2026-10-16T08:05:00Z">2 min ago</time>
                   </div>
                 </li>
               </ul>"#,
        );
        let raws = extract(&s, PageKind::ListingItem, &dom);
        assert_eq!(raws.len(), 1);
        let a = normalize(&s, PageKind::ListingItem, &raws[0]).unwrap();
        assert_eq!(a.title, "Banks rally");
        assert_eq!(a.url, "https://www.reuters.com/business/finance/banks-rally-2026-10-16/");
        assert_eq!(a.category, "Banks");
        assert_eq!(a.published_at.as_deref(), Some("2026-10-16T08:05:00Z"));
        assert_eq!(s.classify_url(&a.url), PageKind::FullArticle);
    }

    #[test]
    fn section_url_is_listing() {
        let s = strategy().unwrap();
        assert_eq!(
            s.classify_url("https://www.reuters.com/business/finance/"),
            PageKind::ListingItem
        );
    }
}
