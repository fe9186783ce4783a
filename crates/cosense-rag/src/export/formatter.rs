//! MDX formatting of a single page

use chrono::{DateTime, SecondsFormat};
use url::Url;

use crate::types::{ExportedDocument, PageDetail, PageSummary};

/// Object key prefix for exported pages
pub const EXPORT_PREFIX: &str = "mdx/";

/// File extension for exported pages
pub const EXPORT_EXTENSION: &str = ".mdx";

/// Turn a page title into a storage-safe file stem
///
/// Every `\ / ? % * : | " < >` and whitespace character becomes `_`, then
/// any `/` left over is written as `%2F`. Distinct titles may collide.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '\\' | '/' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    replaced.replace('/', "%2F")
}

/// Escape a title for a double-quoted front matter value
///
/// Quotes are backslash-escaped and the first `/` is written as `%2F`.
pub fn escape_title(title: &str) -> String {
    title.replace('"', "\\\"").replacen('/', "%2F", 1)
}

/// Epoch seconds as ISO-8601 UTC with millisecond precision
pub fn iso8601(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Link to the page on Cosense: `{base}/{project}/{encoded title}`
pub fn source_url(base: &str, project: &str, title: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().extend([project, title]);
            }
            url.to_string()
        }
        Err(_) => format!("{}/{}/{}", base.trim_end_matches('/'), project, title),
    }
}

/// Object key for a page title
pub fn document_key(title: &str) -> String {
    format!("{}{}{}", EXPORT_PREFIX, sanitize_title(title), EXPORT_EXTENSION)
}

/// Render one page as front matter plus body
pub fn format_document(
    summary: &PageSummary,
    detail: &PageDetail,
    project: &str,
    base_url: &str,
) -> ExportedDocument {
    let front_matter = [
        "---".to_string(),
        format!("title: \"{}\"", escape_title(&summary.title)),
        format!("link: \"{}\"", source_url(base_url, project, &summary.title)),
        format!("created: \"{}\"", iso8601(summary.created)),
        format!("updated: \"{}\"", iso8601(summary.updated)),
        format!("views: {}", summary.views),
        "---".to_string(),
    ]
    .join("\n");

    ExportedDocument {
        key: document_key(&summary.title),
        content: format!("{}\n\n{}", front_matter, detail.body()),
    }
}
