use scraper::Html;

/// Strips markup from a payload, returning the readable text.
///
/// The payload is parsed as an HTML fragment; text nodes are joined with
/// single spaces, so plain-text payloads pass through unchanged apart from
/// edge whitespace. Length is counted in characters, not bytes, so
/// multibyte scripts are not penalized.
pub fn plain_text(payload: &str) -> String {
    let fragment = Html::parse_fragment(payload);
    let mut out = String::new();
    for piece in fragment.root_element().text() {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(trimmed);
    }
    out
}

/// Outcome of the pre-publish gate, evaluated before any network call.
///
/// `Publish` carries the stripped text so the publisher can log a bounded
/// preview without re-stripping; `Skip` carries only the measured length.
#[derive(Debug, Clone)]
pub enum FilterDecision {
    Publish { plain: String },
    Skip { plain_len: usize },
}

/// Length gate for outgoing records: only payloads whose plain text reaches
/// the configured minimum are worth a publish call.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    min_plain_chars: usize,
}

impl MessageFilter {
    pub fn new(min_plain_chars: usize) -> Self {
        Self { min_plain_chars }
    }

    pub fn min_plain_chars(&self) -> usize {
        self.min_plain_chars
    }

    /// Decides whether `payload` should be published. Pure: no logging, no
    /// network, no mutation.
    pub fn decide(&self, payload: &str) -> FilterDecision {
        let plain = plain_text(payload);
        let plain_len = plain.chars().count();
        if plain_len >= self.min_plain_chars {
            FilterDecision::Publish { plain }
        } else {
            FilterDecision::Skip { plain_len }
        }
    }
}
