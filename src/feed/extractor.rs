use crate::content::{ContentFetcher, FetchError};
use crate::feed::parser::{parse_entries, ParseError};
use thiserror::Error;

/// The unit of publishing: one feed entry's title plus the body of the
/// article it links to. Created per entry, consumed immediately by the
/// publisher, never persisted.
#[derive(Debug, Clone)]
pub struct Record {
    /// Correlation handle carried from the feed entry (see [`crate::feed::Entry`]).
    pub id: String,
    pub title: String,
    /// Raw article text, possibly HTML-laden. Empty when the article fetch
    /// failed or the entry had no link.
    pub content: String,
}

/// Why a whole source produced no records this cycle.
///
/// Internal to the extractor: both variants are logged and swallowed at the
/// per-source boundary, never propagated to the cycle.
#[derive(Debug, Error)]
enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Walks the configured sources and turns feed entries into [`Record`]s.
///
/// Failure containment, from smallest scope outward:
/// - a failed article fetch yields a record with empty content;
/// - a feed that cannot be fetched or parsed is skipped with a warning;
/// - the batch itself always completes, in source order then entry order.
pub struct FeedExtractor {
    fetcher: ContentFetcher,
}

impl FeedExtractor {
    pub fn new(fetcher: ContentFetcher) -> Self {
        Self { fetcher }
    }

    /// Extracts records from every source, isolating per-source failures.
    ///
    /// Output preserves source order, then entry document order within each
    /// feed. No fetch is retried here.
    pub async fn extract(&self, sources: &[String]) -> Vec<Record> {
        let mut records = Vec::new();
        for source in sources {
            match self.extract_source(source).await {
                Ok(mut batch) => {
                    tracing::debug!(source = %source, records = batch.len(), "Extracted feed");
                    records.append(&mut batch);
                }
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Skipping feed this cycle");
                }
            }
        }
        records
    }

    async fn extract_source(&self, source: &str) -> Result<Vec<Record>, SourceError> {
        let bytes = self.fetcher.fetch_bytes(source).await?;
        let entries = parse_entries(&bytes)?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let content = match entry.link.as_deref() {
                Some(link) => match self.fetcher.fetch_text(link).await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!(
                            entry = %entry.id,
                            link = %link,
                            error = %e,
                            "Article fetch failed, keeping entry with empty content"
                        );
                        String::new()
                    }
                },
                None => {
                    tracing::debug!(entry = %entry.id, "Feed entry has no link");
                    String::new()
                }
            };

            records.push(Record {
                id: entry.id,
                title: entry.title,
                content,
            });
        }

        Ok(records)
    }
}
