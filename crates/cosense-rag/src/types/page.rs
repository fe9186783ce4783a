//! Page types returned by the Cosense API

use serde::{Deserialize, Serialize};

/// One entry of the page listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageSummary {
    /// Page title, unique within a project
    pub title: String,
    /// Creation time (epoch seconds)
    #[serde(default)]
    pub created: i64,
    /// Last update time (epoch seconds)
    #[serde(default)]
    pub updated: i64,
    /// View count
    #[serde(default)]
    pub views: u64,
}

/// One page of the listing API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageListing {
    /// Total number of pages in the project at the time of the call
    pub count: usize,
    /// Summaries in this window
    #[serde(default)]
    pub pages: Vec<PageSummary>,
}

/// A single line of page content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Line {
    pub text: String,
}

/// Page body as returned by the detail API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDetail {
    #[serde(default)]
    pub lines: Vec<Line>,
}

impl PageDetail {
    /// Line texts joined with `\n`
    pub fn body(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A formatted page ready to be written to the object store
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    /// Object key (`mdx/{sanitized title}.mdx`)
    pub key: String,
    /// Front matter followed by the body
    pub content: String,
}
