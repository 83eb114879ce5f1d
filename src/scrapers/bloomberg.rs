//! Bloomberg strategy.
//!
//! Only the markets landing page is read. Article bodies sit behind a
//! paywall, so discovered links are not followed.

use crate::classify::RouteSpec;
use crate::error::ConfigError;
use crate::extract::selector::ProbeSpec::{Attr, Text};
use crate::models::{PageKind, SourceId};
use crate::strategy::{FieldMap, LayoutSpec, SourceStrategy};

pub fn strategy() -> Result<SourceStrategy, ConfigError> {
    SourceStrategy::builder(SourceId::BLOOMBERG, "Bloomberg", "https://www.bloomberg.com")
        .target("/markets")
        .route(RouteSpec::PathPattern(
            r"^/news/articles/\d{4}-\d{2}-\d{2}/[A-Za-z0-9]+",
            PageKind::FullArticle,
        ))
        .layout(
            PageKind::ListingItem,
            LayoutSpec::list(&[
                "article.story-package-module__story",
                "div[data-component='story-list'] article",
                "[data-component='headline-story']",
            ])
            .field(
                "headline",
                &[
                    Text("h3.story-package-module__headline"),
                    Text("[data-component='headline']"),
                    Text("h3"),
                ],
            )
            .field(
                "link",
                &[
                    Attr("a.story-package-module__headline-link", "href"),
                    Attr("a[data-component='headline-link']", "href"),
                    Attr("a[href]", "href"),
                ],
            )
            .field(
                "summary",
                &[Text("div.story-package-module__summary"), Text("[data-component='summary']")],
            )
            .field("published", &[Attr("time[datetime]", "datetime"), Attr("[data-updated-at]", "data-updated-at")])
            .field("thumb", &[Attr("img", "src")])
            .ceiling(10),
        )
        .fields(FieldMap {
            summary: Some("summary"),
            published_at: Some("published"),
            image_url: Some("thumb"),
            ..FieldMap::required("headline", "link")
        })
        .default_category("markets")
        .build()
}
