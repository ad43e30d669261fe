//! Plain-text rendering of fetched pages.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

lazy_static! {
    static ref BODY_ELEMENTS: Selector = Selector::parse("body *").unwrap();
    static ref SCRIPT: Selector = Selector::parse("script").unwrap();
    static ref IMAGE_ALT: Selector = Selector::parse("img[alt]").unwrap();
    static ref NEWLINES: Regex = Regex::new(r"\n+").unwrap();
}

const SKIPPED: [&str; 3] = ["style", "script", "svg"];

/// Flatten a page body into one line of text.
///
/// Each element contributes only its own text nodes. Links become
/// `[text](absolute href)` so the model can follow them.
pub fn page_text(html: &str, base: &Url) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();

    for element in document.select(&BODY_ELEMENTS) {
        if SKIPPED.contains(&element.value().name()) {
            continue;
        }
        if element.select(&SCRIPT).next().is_some() {
            continue;
        }

        let mut content = own_text(&element);
        match element.value().attr("href") {
            Some(href) if element.value().name() == "a" => {
                let href = absolute_href(base, href);
                if let Some(alt) = element
                    .select(&IMAGE_ALT)
                    .next()
                    .and_then(|img| img.value().attr("alt"))
                    .map(str::trim)
                    .filter(|alt| !alt.is_empty())
                {
                    content.push(' ');
                    content.push_str(alt);
                }
                text.push_str(&format!(" [{}]({})", content, href));
            }
            _ if !content.is_empty() => {
                text.push(' ');
                text.push_str(&content);
            }
            _ => {}
        }
    }

    NEWLINES.replace_all(text.trim(), " ").into_owned()
}

fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .map(|text| &**text)
        .collect::<String>()
        .trim()
        .to_string()
}

fn absolute_href(base: &Url, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    base.join(href).map(String::from).unwrap_or_default()
}
