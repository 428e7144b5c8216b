use crate::error::ScrapeError;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use url::Url;

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").expect("horizontal whitespace regex must be valid"));
static EXCESS_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("line break regex must be valid"));

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "table", "tr",
];

pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}

pub fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector).map_err(|err| ScrapeError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{err:?}"),
    })
}

pub fn select<'a>(doc: &'a Html, selector: &Selector) -> Vec<ElementRef<'a>> {
    doc.select(selector).collect()
}

pub fn select_within<'a>(node: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    node.select(selector).collect()
}

pub fn select_texts(doc: &Html, selector: &Selector) -> Vec<String> {
    doc.select(selector).map(block_text).collect()
}

pub fn inline_text(node: ElementRef<'_>) -> String {
    node.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text that keeps paragraph structure: block elements are separated by a blank
/// line and `<br>` becomes a newline. Compound-field markers such as
/// `"\n\nContact"` rely on this.
pub fn block_text(node: ElementRef<'_>) -> String {
    let mut out = String::new();
    for descendant in node.descendants().skip(1) {
        match descendant.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if element.name() == "br" => out.push('\n'),
            Node::Element(element) if BLOCK_ELEMENTS.contains(&element.name()) => {
                if !out.trim().is_empty() && !out.ends_with("\n\n") {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
    normalize_block(&out)
}

pub fn attribute(node: ElementRef<'_>, name: &str) -> Option<String> {
    node.value().attr(name).map(ToString::to_string)
}

pub fn normalize_block(text: &str) -> String {
    let working = text.replace("\r\n", "\n");
    let working = HORIZONTAL_WS.replace_all(&working, " ");
    let working = working
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    EXCESS_BREAKS
        .replace_all(&working, "\n\n")
        .trim()
        .to_string()
}

pub fn absolutize_url(base_url: Option<&str>, value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        return value.to_string();
    }

    if let Some(base) = base_url
        && let Ok(base_url) = Url::parse(base)
        && let Ok(joined) = base_url.join(value)
    {
        return joined.to_string();
    }

    value.to_string()
}
