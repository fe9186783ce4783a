//! Final answer assembly with a list of cited pages

use crate::config::AppConfig;
use crate::export::{source_url, EXPORT_EXTENSION};
use crate::types::SearchResponse;

/// How the sources section is rendered
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    /// Project the pages belong to
    pub project: String,
    /// Cosense base URL for the links
    pub base_url: String,
    /// Heading line of the sources section
    pub heading: String,
    /// List each page once, in order of first appearance
    pub dedupe: bool,
}

impl AnswerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            project: config.cosense.project_name.clone(),
            base_url: config.cosense.base_url.clone(),
            heading: config.search.sources_heading.clone(),
            dedupe: config.search.dedupe_sources,
        }
    }
}

/// Page title encoded in an exported document's object key
///
/// `mdx/Some_page.mdx` becomes `Some_page`.
pub fn page_title_from_filename(filename: &str) -> &str {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    name.strip_suffix(EXPORT_EXTENSION).unwrap_or(name)
}

/// Response text, continuation if any, then a sources section
pub fn build_answer(response: &SearchResponse, options: &AnswerOptions) -> String {
    let mut text = response.response.clone();
    if response.has_more {
        if let Some(next) = response.next_page.as_deref() {
            text.push_str(next);
        }
    }

    let mut titles: Vec<&str> = Vec::with_capacity(response.data.len());
    for chunk in &response.data {
        let title = page_title_from_filename(&chunk.filename);
        if options.dedupe && titles.contains(&title) {
            continue;
        }
        titles.push(title);
    }

    let sources = titles
        .iter()
        .map(|title| {
            format!(
                "- [{}]({})",
                title,
                source_url(&options.base_url, &options.project, title)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n\n{}\n{}", text, options.heading, sources)
}
