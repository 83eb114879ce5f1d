//! Normalization of raw, source-shaped records into [`CanonicalArticle`]s.
//!
//! The normalizer is a pure function of the strategy and the raw record, so
//! normalizing the same record twice gives identical output. Records without
//! a title or a resolvable url are rejected here and never reach the batch.

use crate::error::Rejected;
use crate::models::{CanonicalArticle, PageKind, RawExtraction};
use crate::strategy::SourceStrategy;
use crate::utils::clean_text;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use itertools::Itertools;
use url::Url;

/// Datetime layouts seen on source pages, tried after RFC 3339 / RFC 2822.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%B %d, %Y %I:%M %p UTC",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

/// Map one raw record onto the canonical schema.
pub fn normalize(
    strategy: &SourceStrategy,
    kind: PageKind,
    raw: &RawExtraction,
) -> Result<CanonicalArticle, Rejected> {
    let map = strategy.field_map();
    let text = |field: Option<&'static str>| -> Option<String> {
        field
            .and_then(|f| raw.get(f))
            .map(clean_text)
            .filter(|s| !s.is_empty())
    };

    let title = text(Some(map.title)).ok_or(Rejected::MissingTitle)?;
    let href = text(Some(map.url)).ok_or(Rejected::MissingUrl)?;
    let url = resolve_url(strategy.base_url(), &href).ok_or(Rejected::UnresolvableUrl(href))?;

    Ok(CanonicalArticle {
        title,
        url: url.to_string(),
        summary: text(map.summary).unwrap_or_default(),
        published_at: text(map.published_at).and_then(|d| coerce_date(&d)),
        image_url: text(map.image_url)
            .and_then(|i| resolve_url(strategy.base_url(), &i))
            .map(String::from),
        source: strategy.id().clone(),
        category: text(map.category).unwrap_or_else(|| strategy.default_category().to_string()),
        author: text(map.author),
        tickers: normalize_tickers(&raw.tickers),
        kind,
        content: text(map.content).unwrap_or_default(),
    })
}

/// Resolve `href` against `base`, keeping only http(s) and dropping the
/// fragment so the url is a stable key.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Coerce a date-like string to ISO-8601.
///
/// Datetimes become UTC `YYYY-MM-DDTHH:MM:SSZ`, bare dates `YYYY-MM-DD`.
/// Anything unparseable ("2 hours ago") is kept verbatim; empty input is
/// `None`.
pub fn coerce_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let iso = |dt: DateTime<Utc>| dt.to_rfc3339_opts(SecondsFormat::Secs, true);

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(iso(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(iso(dt.with_timezone(&Utc)));
    }
    if let Some(dt) = parse_epoch(s) {
        return Some(iso(dt));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(iso(Utc.from_utc_datetime(&naive)));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    Some(s.to_string())
}

/// Unix seconds (10 digits) or milliseconds (13 digits), as found in
/// `data-*` timestamp attributes.
fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: i64 = s.parse().ok()?;
    match s.len() {
        10 => DateTime::from_timestamp(n, 0),
        13 => DateTime::from_timestamp_millis(n),
        _ => None,
    }
}

/// Uppercase, trim and de-duplicate tickers across the whole record.
pub fn normalize_tickers(tickers: &[String]) -> Vec<String> {
    tickers
        .iter()
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceId;
    use crate::strategy::FieldMap;

    fn strategy() -> SourceStrategy {
        SourceStrategy::builder(SourceId::new("demo"), "Demo", "https://demo.example.com/markets/")
            .fields(FieldMap {
                summary: Some("blurb"),
                published_at: Some("stamp"),
                image_url: Some("pic"),
                category: Some("section"),
                ..FieldMap::required("headline", "link")
            })
            .default_category("markets")
            .build()
            .unwrap()
    }

    fn raw(pairs: &[(&'static str, &str)]) -> RawExtraction {
        let mut r = RawExtraction::default();
        for &(k, v) in pairs {
            r.insert(k, v.to_string());
        }
        r
    }

    #[test]
    fn maps_source_fields_onto_canonical_schema() {
        let r = raw(&[
            ("headline", "Fed holds"),
            ("link", "/content/abc#comments"),
            ("blurb", "Rates unchanged"),
            ("stamp", "2026-10-16T14:30:00+02:00"),
            ("pic", "img/1.png"),
        ]);
        let a = normalize(&strategy(), PageKind::ListingItem, &r).unwrap();
        assert_eq!(a.title, "Fed holds");
        assert_eq!(a.url, "https://demo.example.com/content/abc");
        assert_eq!(a.summary, "Rates unchanged");
        assert_eq!(a.published_at.as_deref(), Some("2026-10-16T12:30:00Z"));
        assert_eq!(a.image_url.as_deref(), Some("https://demo.example.com/markets/img/1.png"));
        assert_eq!(a.category, "markets");
        assert_eq!(a.author, None);
        assert_eq!(a.source, SourceId::new("demo"));
        assert_eq!(a.kind, PageKind::ListingItem);
    }

    #[test]
    fn missing_title_or_url_is_rejected() {
        let s = strategy();
        assert_eq!(
            normalize(&s, PageKind::ListingItem, &raw(&[("link", "/a")])),
            Err(Rejected::MissingTitle)
        );
        assert_eq!(
            normalize(&s, PageKind::ListingItem, &raw(&[("headline", "T"), ("link", "   ")])),
            Err(Rejected::MissingUrl)
        );
        assert!(matches!(
            normalize(&s, PageKind::ListingItem, &raw(&[("headline", "T"), ("link", "javascript:void(0)")])),
            Err(Rejected::UnresolvableUrl(_))
        ));
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let mut r = raw(&[("headline", "T"), ("link", "/a"), ("stamp", "Oct 16, 2026")]);
        r.tickers = vec!["aapl".into(), "AAPL".into(), " msft ".into()];
        let a = normalize(&strategy(), PageKind::ListingItem, &r).unwrap();
        let b = normalize(&strategy(), PageKind::ListingItem, &r).unwrap();
        assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
        assert_eq!(a.tickers, vec!["AAPL", "MSFT"]);
        assert_eq!(a.published_at.as_deref(), Some("2026-10-16"));
    }

    #[test]
    fn relative_dates_are_kept_verbatim() {
        assert_eq!(coerce_date("2 hours ago").as_deref(), Some("2 hours ago"));
        assert_eq!(coerce_date("   "), None);
    }

    #[test]
    fn coerces_common_date_layouts() {
        assert_eq!(
            coerce_date("Fri, 16 Oct 2026 09:00:00 GMT").as_deref(),
            Some("2026-10-16T09:00:00Z")
        );
        assert_eq!(coerce_date("2026-10-16T09:00:00.123Z").as_deref(), Some("2026-10-16T09:00:00Z"));
        assert_eq!(coerce_date("2026-10-16T09:00:00").as_deref(), Some("2026-10-16T09:00:00Z"));
        assert_eq!(coerce_date("1792141200").as_deref(), Some("2026-10-16T09:00:00Z"));
        assert_eq!(coerce_date("1792141200000").as_deref(), Some("2026-10-16T09:00:00Z"));
        assert_eq!(
            coerce_date("October 16, 2026 9:00 AM UTC").as_deref(),
            Some("2026-10-16T09:00:00Z")
        );
        assert_eq!(coerce_date("16 October 2026").as_deref(), Some("2026-10-16"));
    }

    #[test]
    fn extracted_category_wins_over_default() {
        let r = raw(&[("headline", "T"), ("link", "/a"), ("section", "Equities")]);
        let a = normalize(&strategy(), PageKind::ListingItem, &r).unwrap();
        assert_eq!(a.category, "Equities");
    }
}
