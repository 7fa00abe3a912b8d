use feed_rs::parser;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Feed not parseable: {0}")]
    Malformed(#[from] feed_rs::parser::ParseFeedError),
}

/// One item from a parsed feed: the title and the article link, if any.
///
/// The `id` is a stable correlation handle used in log output so a record
/// can be traced from extraction through delivery. It comes from the feed's
/// own entry id when present, otherwise it is derived from link and title.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub link: Option<String>,
}

/// Parses an RSS or Atom document into entries, in document order.
///
/// Entries without a title get "Untitled"; entries without links are kept
/// (the extractor publishes them with empty content rather than dropping
/// them silently).
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<Entry>, ParseError> {
    let feed = parser::parse(bytes)?;

    let entries: Vec<Entry> = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let id = entry_id(existing_id, link.as_deref(), &title);

            Entry { id, title, link }
        })
        .collect();

    Ok(entries)
}

fn entry_id(existing: Option<&str>, link: Option<&str>, title: &str) -> String {
    if let Some(id) = existing {
        let trimmed = id.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!("{}|{}", link.unwrap_or(""), title);
    let hash = format!("{:x}", Sha256::digest(input.as_bytes()));
    // 12 hex chars is plenty for log correlation within one process
    hash[..12].to_string()
}
