//! Response body to markdown conversion
//!
//! - markdown and plain text: whitespace normalization only
//! - HTML / XHTML: title via scraper, body via htmd
//! - JSON / XML: wrapped in a fenced code block

use scraper::{Html, Selector};
use url::Url;

/// Tags dropped before HTML is converted
const SKIPPED_TAGS: [&str; 6] = ["script", "style", "noscript", "head", "nav", "footer"];

/// Markdown ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedContent {
    pub markdown: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Html,
    Text,
    Code(&'static str),
}

fn body_kind(content_type: &str) -> BodyKind {
    let Ok(parsed) = content_type.trim().parse::<mime::Mime>() else {
        return BodyKind::Text;
    };

    match (parsed.type_().as_str(), parsed.subtype().as_str()) {
        (_, "html") | (_, "xhtml") => BodyKind::Html,
        (_, "json") => BodyKind::Code("json"),
        (_, "xml") => BodyKind::Code("xml"),
        _ => BodyKind::Text,
    }
}

/// Converts a fetched body into markdown plus an optional title
///
/// Never fails: if HTML conversion errors, the document's text content is
/// used instead.
pub fn process_content(body: &str, content_type: &str, url: &Url) -> ProcessedContent {
    match body_kind(content_type) {
        BodyKind::Text => {
            let markdown = normalize_whitespace(body);
            let title = markdown_title(&markdown);
            ProcessedContent { markdown, title }
        }
        BodyKind::Html => {
            let document = Html::parse_document(body);
            let title = html_title(&document);

            let converter = htmd::HtmlToMarkdown::builder()
                .skip_tags(SKIPPED_TAGS.to_vec())
                .build();
            let markdown = match converter.convert(body) {
                Ok(markdown) => markdown,
                Err(e) => {
                    tracing::debug!("HTML conversion failed for {}: {}; using text", url, e);
                    document.root_element().text().collect::<Vec<_>>().join(" ")
                }
            };

            ProcessedContent {
                markdown: normalize_whitespace(&markdown),
                title,
            }
        }
        BodyKind::Code(lang) => ProcessedContent {
            markdown: format!("```{}\n{}\n```\n", lang, body.trim_end()),
            title: None,
        },
    }
}

/// Normalizes line endings and blank lines
///
/// CRLF becomes LF, trailing whitespace is trimmed from each line, runs of
/// blank lines shrink to one, and the result ends with a single newline.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            continue;
        }

        if !out.is_empty() && blank_run > 0 {
            out.push('\n');
        }
        blank_run = 0;
        out.push_str(line);
        out.push('\n');
    }

    out
}

/// First `# ` heading of a markdown document
fn markdown_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

/// `<title>`, falling back to the first `<h1>`
fn html_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .next()
            .map(|element| {
                element
                    .text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|s| !s.is_empty())
    })
}
