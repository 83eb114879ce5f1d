//! Selector chains: ordered fallbacks for reading one value out of markup.
//!
//! Sites rename classes without notice, so every field is declared as a list
//! of probes. The first probe that yields a non-empty value wins; a chain that
//! runs dry means the field is absent, which is not an error.

use crate::error::ConfigError;
use crate::utils::clean_text;
use scraper::{ElementRef, Selector};

/// Declarative form of a [`Probe`], written in strategy definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSpec {
    /// Text of the first element matching the selector.
    Text(&'static str),
    /// An attribute of the first element matching the selector.
    Attr(&'static str, &'static str),
    /// Text of every matching element, joined with a space.
    JoinedText(&'static str),
}

/// Compiled probe.
#[derive(Debug, Clone)]
pub enum Probe {
    Text(Selector),
    Attr(Selector, &'static str),
    JoinedText(Selector),
}

/// Parse a CSS selector, mapping the parser's borrowed error into a
/// [`ConfigError`].
pub fn css(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

impl Probe {
    pub fn compile(spec: ProbeSpec) -> Result<Self, ConfigError> {
        Ok(match spec {
            ProbeSpec::Text(sel) => Probe::Text(css(sel)?),
            ProbeSpec::Attr(sel, attr) => Probe::Attr(css(sel)?, attr),
            ProbeSpec::JoinedText(sel) => Probe::JoinedText(css(sel)?),
        })
    }

    /// First non-empty value under `scope`.
    pub fn read(&self, scope: ElementRef<'_>) -> Option<String> {
        match self {
            Probe::Text(sel) => scope.select(sel).next().map(element_text).and_then(non_empty),
            Probe::Attr(sel, attr) => scope
                .select(sel)
                .next()
                .and_then(|el| el.value().attr(attr))
                .map(clean_text)
                .and_then(non_empty),
            Probe::JoinedText(sel) => {
                let parts: Vec<String> = scope
                    .select(sel)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                non_empty(parts.join(" "))
            }
        }
    }

    /// Every non-empty value under `scope`, in document order.
    pub fn read_all(&self, scope: ElementRef<'_>) -> Vec<String> {
        match self {
            Probe::Text(sel) => scope
                .select(sel)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect(),
            Probe::Attr(sel, attr) => scope
                .select(sel)
                .filter_map(|el| el.value().attr(attr))
                .map(clean_text)
                .filter(|t| !t.is_empty())
                .collect(),
            Probe::JoinedText(_) => self.read(scope).into_iter().collect(),
        }
    }
}

/// Ordered probes for one field: primary first, then fallbacks.
#[derive(Debug, Clone, Default)]
pub struct SelectorChain(Vec<Probe>);

impl SelectorChain {
    pub fn compile(specs: &[ProbeSpec]) -> Result<Self, ConfigError> {
        specs
            .iter()
            .map(|s| Probe::compile(*s))
            .collect::<Result<Vec<_>, _>>()
            .map(SelectorChain)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value from the first probe that yields one.
    pub fn first(&self, scope: ElementRef<'_>) -> Option<String> {
        self.0.iter().find_map(|p| p.read(scope))
    }

    /// All values from the first probe that yields any.
    pub fn all(&self, scope: ElementRef<'_>) -> Vec<String> {
        self.0
            .iter()
            .map(|p| p.read_all(scope))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

/// Ordered selectors for the repeated item blocks of a list page.
#[derive(Debug, Clone, Default)]
pub struct ContainerChain(Vec<Selector>);

impl ContainerChain {
    pub fn compile(selectors: &[&'static str]) -> Result<Self, ConfigError> {
        selectors
            .iter()
            .map(|s| css(s))
            .collect::<Result<Vec<_>, _>>()
            .map(ContainerChain)
    }

    /// Matches of the first selector that matches anything.
    pub fn select<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        self.0
            .iter()
            .map(|sel| scope.select(sel).collect::<Vec<_>>())
            .find(|v| !v.is_empty())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    const PAGE: &str = r#"
        <html><body>
          <div class="card">
            <h3 class="new-headline">  Fed   holds
              rates </h3>
            <a class="link" href="/a/1">read</a>
            <img data-src="/img/1.png">
            <p class="body">One.</p><p class="body"></p><p class="body">Two.</p>
          </div>
        </body></html>"#;

    #[test]
    fn chain_falls_back_to_next_probe() {
        let dom = Html::parse_document(PAGE);
        let chain = SelectorChain::compile(&[
            ProbeSpec::Text("h3.old-headline"),
            ProbeSpec::Text("h3.new-headline"),
        ])
        .unwrap();
        assert_eq!(chain.first(dom.root_element()).as_deref(), Some("Fed holds rates"));
    }

    #[test]
    fn attribute_probe_skips_missing_attribute() {
        let dom = Html::parse_document(PAGE);
        let chain =
            SelectorChain::compile(&[ProbeSpec::Attr("img", "src"), ProbeSpec::Attr("img", "data-src")])
                .unwrap();
        assert_eq!(chain.first(dom.root_element()).as_deref(), Some("/img/1.png"));
    }

    #[test]
    fn joined_text_skips_empty_nodes() {
        let dom = Html::parse_document(PAGE);
        let chain = SelectorChain::compile(&[ProbeSpec::JoinedText("p.body")]).unwrap();
        assert_eq!(chain.first(dom.root_element()).as_deref(), Some("One. Two."));
    }

    #[test]
    fn exhausted_chain_is_absent() {
        let dom = Html::parse_document(PAGE);
        let chain = SelectorChain::compile(&[ProbeSpec::Text("span.byline")]).unwrap();
        assert_eq!(chain.first(dom.root_element()), None);
        assert!(chain.all(dom.root_element()).is_empty());
    }

    #[test]
    fn invalid_selector_is_config_error() {
        let err = SelectorChain::compile(&[ProbeSpec::Text("div[")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));
    }

    #[test]
    fn container_chain_uses_first_matching_selector() {
        let dom = Html::parse_document(PAGE);
        let chain = ContainerChain::compile(&["li.story", "div.card"]).unwrap();
        assert_eq!(chain.select(dom.root_element()).len(), 1);
    }
}
