//! Contact address extraction from a single HTML document.
//!
//! Three independent passes run over the parsed page and their results are
//! unioned by [`AddressExtractor::extract`]:
//!
//! 1. `mailto:` links, taken as-is
//! 2. a regex scan of the rendered text, kept only when the address looks
//!    related to the target domain
//! 3. `data-email` attributes, taken as-is

use crate::normalize::domain_base;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::debug;

/// Local parts accepted by the relevance filter regardless of the address' domain
pub const DEFAULT_GENERIC_LOCAL_PARTS: [&str; 8] = [
    "info", "contact", "admin", "support", "hello", "sales", "press", "team",
];

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
});

static MAILTO_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).expect("valid mailto selector"));

static DATA_EMAIL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-email]").expect("valid data-email selector"));

#[derive(Debug, Clone)]
pub struct AddressExtractor {
    generic_local_parts: Vec<String>,
}

impl AddressExtractor {
    pub fn new<I, S>(generic_local_parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            generic_local_parts: generic_local_parts
                .into_iter()
                .map(|part| part.as_ref().trim().to_lowercase())
                .filter(|part| !part.is_empty())
                .collect(),
        }
    }

    /// All plausible contact addresses on the page, lower-cased.
    pub fn extract(&self, html: &str, domain: &str) -> BTreeSet<String> {
        let document = Html::parse_document(html);

        let mut found = mailto_addresses(&document);
        found.extend(
            text_addresses(&document)
                .into_iter()
                .filter(|email| self.is_relevant(email, domain)),
        );
        found.extend(attribute_addresses(&document));

        debug!("Extracted {} address(es) for {}", found.len(), domain);
        found
    }

    /// Relevance filter for addresses scraped out of free text.
    pub fn is_relevant(&self, email: &str, domain: &str) -> bool {
        let email = email.to_lowercase();
        let base = domain_base(domain);

        if !domain.is_empty() && email.contains(domain) {
            return true;
        }
        if !base.is_empty() && email.contains(base) {
            return true;
        }

        email
            .split_once('@')
            .is_some_and(|(local, _)| self.generic_local_parts.iter().any(|g| g == local))
    }
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_GENERIC_LOCAL_PARTS)
    }
}

/// Targets of `mailto:` links, with any `?subject=...` query dropped.
pub fn mailto_addresses(document: &Html) -> BTreeSet<String> {
    document
        .select(&MAILTO_SELECTOR)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| href.strip_prefix("mailto:"))
        .map(|target| target.split('?').next().unwrap_or("").trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

/// Every email-shaped token in the page text. Unfiltered.
pub fn text_addresses(document: &Html) -> BTreeSet<String> {
    let text = visible_text(document);

    EMAIL_REGEX
        .find_iter(&text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Values of `data-email` attributes.
pub fn attribute_addresses(document: &Html) -> BTreeSet<String> {
    document
        .select(&DATA_EMAIL_SELECTOR)
        .filter_map(|element| element.value().attr("data-email"))
        .map(|value| value.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

/// Elements that start a new line when rendered. Text inside inline markup
/// (`span`, `b`, `a`, ...) is joined without a separator, as a browser shows it.
fn is_block(name: &str) -> bool {
    matches!(
        name,
        "html"
            | "head"
            | "body"
            | "title"
            | "address"
            | "article"
            | "aside"
            | "blockquote"
            | "dd"
            | "details"
            | "div"
            | "dl"
            | "dt"
            | "fieldset"
            | "figcaption"
            | "figure"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "li"
            | "main"
            | "nav"
            | "ol"
            | "option"
            | "p"
            | "pre"
            | "section"
            | "summary"
            | "table"
            | "tbody"
            | "td"
            | "tfoot"
            | "th"
            | "thead"
            | "tr"
            | "ul"
    )
}

// Script and style bodies are never rendered.
fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    let mut current_block = None;

    for node in document.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            if element.name() == "br" {
                text.push(' ');
            }
            continue;
        }

        let Some(fragment) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .is_some_and(|element| matches!(element.name(), "script" | "style"));
        if hidden {
            continue;
        }

        // A new block means a line break between this text and the last
        let block = node
            .ancestors()
            .find(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| is_block(element.name()))
            })
            .map(|ancestor| ancestor.id());
        if block != current_block {
            text.push(' ');
            current_block = block;
        }

        text.push_str(fragment);
    }

    text
}
