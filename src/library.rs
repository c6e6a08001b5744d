//! Document library view: filtering, sorting and card summaries.

use std::cmp::Ordering;
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};
use docsearch_core::models::Document;
use serde::{Deserialize, Serialize};

/// Characters of chunk text shown on a library card.
pub const PREVIEW_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    FilenameAsc,
    FilenameDesc,
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "newest" | "newest_first" => Ok(SortOrder::NewestFirst),
            "oldest" | "oldest_first" => Ok(SortOrder::OldestFirst),
            "name" | "filename" | "filename_asc" | "a_z" => Ok(SortOrder::FilenameAsc),
            "filename_desc" | "z_a" => Ok(SortOrder::FilenameDesc),
            other => bail!(
                "Unknown sort order: '{}'. Use newest, oldest, filename-asc or filename-desc.",
                other
            ),
        }
    }
}

/// What the library shows: an optional substring filter and an order.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl LibraryQuery {
    /// Keep documents matching the filter, ordered by `sort`.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let needle = self
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let mut docs: Vec<Document> = match needle {
            Some(needle) => docs.into_iter().filter(|d| matches(d, &needle)).collect(),
            None => docs,
        };

        match self.sort {
            SortOrder::NewestFirst => docs.sort_by(|a, b| by_date(a.created_at, b.created_at, true)),
            SortOrder::OldestFirst => docs.sort_by(|a, b| by_date(a.created_at, b.created_at, false)),
            SortOrder::FilenameAsc => docs.sort_by_cached_key(|d| d.filename.to_lowercase()),
            SortOrder::FilenameDesc => {
                docs.sort_by_cached_key(|d| std::cmp::Reverse(d.filename.to_lowercase()))
            }
        }
        docs
    }
}

fn matches(doc: &Document, needle: &str) -> bool {
    doc.filename.to_lowercase().contains(needle)
        || doc.chunks.iter().any(|c| c.text.to_lowercase().contains(needle))
}

// Undated documents sort last either way.
fn by_date(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>, newest_first: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if newest_first => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One library card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    /// `YYYY-MM-DD HH:MM` or `Unknown date`.
    pub uploaded: String,
    pub created_at: Option<DateTime<Utc>>,
    pub chunks: usize,
    pub embedded_chunks: usize,
    pub preview: String,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        let source = doc
            .chunks
            .first()
            .map(|c| c.text.as_str())
            .unwrap_or(&doc.content);
        Self {
            id: doc.id.clone(),
            filename: doc.filename.clone(),
            uploaded: doc.uploaded(),
            created_at: doc.created_at,
            chunks: doc.chunks.len(),
            embedded_chunks: doc.embedded_chunks(),
            preview: format!("{}...", truncate_chars(source, PREVIEW_CHARS)),
        }
    }
}

/// Full document text: the chunk texts concatenated in order.
pub fn full_text(doc: &Document) -> String {
    doc.chunks.iter().map(|c| c.text.as_str()).collect()
}

/// First `n` characters of `s`.
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use docsearch_core::models::Chunk;

    fn doc(id: &str, filename: &str, days: Option<i64>, text: &str) -> Document {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Document {
            id: id.to_string(),
            filename: filename.to_string(),
            content: text.to_string(),
            created_at: days.map(|d| base + Duration::days(d)),
            chunks: vec![Chunk::new(text)],
        }
    }

    fn corpus() -> Vec<Document> {
        vec![
            doc("1", "beta.txt", Some(1), "Quarterly revenue grew."),
            doc("2", "Alpha.pdf", Some(3), "Meeting notes about hiring."),
            doc("3", "gamma.txt", None, "Legacy import."),
            doc("4", "delta.txt", Some(2), "Revenue forecast."),
        ]
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn newest_and_oldest_keep_undated_last() {
        let newest = LibraryQuery::default().apply(corpus());
        assert_eq!(ids(&newest), vec!["2", "4", "1", "3"]);

        let oldest = LibraryQuery {
            filter: None,
            sort: SortOrder::OldestFirst,
        }
        .apply(corpus());
        assert_eq!(ids(&oldest), vec!["1", "4", "2", "3"]);
    }

    #[test]
    fn filename_sorts_ignore_case() {
        let asc = LibraryQuery {
            filter: None,
            sort: SortOrder::FilenameAsc,
        }
        .apply(corpus());
        assert_eq!(ids(&asc), vec!["2", "1", "4", "3"]);

        let desc = LibraryQuery {
            filter: None,
            sort: SortOrder::FilenameDesc,
        }
        .apply(corpus());
        assert_eq!(ids(&desc), vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn filter_matches_filename_or_chunk_text() {
        let q = LibraryQuery {
            filter: Some("REVENUE".to_string()),
            sort: SortOrder::NewestFirst,
        };
        assert_eq!(ids(&q.apply(corpus())), vec!["4", "1"]);

        let q = LibraryQuery {
            filter: Some(".pdf".to_string()),
            sort: SortOrder::NewestFirst,
        };
        assert_eq!(ids(&q.apply(corpus())), vec!["2"]);

        let blank = LibraryQuery {
            filter: Some("   ".to_string()),
            sort: SortOrder::NewestFirst,
        };
        assert_eq!(blank.apply(corpus()).len(), 4);
    }

    #[test]
    fn sort_order_parses_cli_spellings() {
        assert_eq!("newest".parse::<SortOrder>().unwrap(), SortOrder::NewestFirst);
        assert_eq!("Oldest-First".parse::<SortOrder>().unwrap(), SortOrder::OldestFirst);
        assert_eq!("filename-asc".parse::<SortOrder>().unwrap(), SortOrder::FilenameAsc);
        assert_eq!("z-a".parse::<SortOrder>().unwrap(), SortOrder::FilenameDesc);
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn summary_preview_and_unknown_date() {
        let long = "é".repeat(250);
        let summary = DocumentSummary::from(&doc("9", "x.txt", None, &long));
        assert_eq!(summary.uploaded, "Unknown date");
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.preview.chars().count(), PREVIEW_CHARS + 3);
        assert!(summary.preview.ends_with("..."));
    }

    #[test]
    fn full_text_concatenates_chunks() {
        let mut d = doc("1", "a.txt", None, "one ");
        d.chunks.push(Chunk::new("two"));
        assert_eq!(full_text(&d), "one two");
    }
}
