use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("fetch of {url} failed after {attempts} attempt(s): {message}")]
    Fetch {
        url: String,
        attempts: u8,
        message: String,
    },

    #[error("malformed page {url}: {reason}")]
    MalformedPage { url: String, reason: String },

    #[error("listing page {url} has {titles} titles but {snippets} snippets")]
    ListingShape {
        url: String,
        titles: usize,
        snippets: usize,
    },

    #[error("{family} row for id {id} has {found} slots, schema declares {expected}")]
    SchemaWidth {
        family: &'static str,
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("id mismatch for {url}: listing says {listing_id}, detail page says {detail_id}")]
    IdMismatch {
        url: String,
        listing_id: String,
        detail_id: String,
    },

    #[error("detail page {url} yields id {id}, which no listing entry carries")]
    UnlistedRecord { url: String, id: String },

    #[error("duplicate id {id} from {url}; first seen at {first_url}")]
    DuplicateId {
        id: String,
        url: String,
        first_url: String,
    },

    #[error("ngram '{0}' was never observed in the corpus")]
    UnseenNgram(String),

    #[error("document '{0}' is not part of the corpus")]
    UnknownDocument(String),

    #[error("invalid selector {selector}: {message}")]
    InvalidSelector { selector: String, message: String },
}

impl ScrapeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Fetch { .. } => "fetch",
            ScrapeError::MalformedPage { .. } => "malformed_page",
            ScrapeError::ListingShape { .. } => "listing_shape",
            ScrapeError::SchemaWidth { .. } => "schema_width",
            ScrapeError::IdMismatch { .. } => "id_mismatch",
            ScrapeError::UnlistedRecord { .. } => "unlisted_record",
            ScrapeError::DuplicateId { .. } => "duplicate_id",
            ScrapeError::UnseenNgram(_) => "unseen_ngram",
            ScrapeError::UnknownDocument(_) => "unknown_document",
            ScrapeError::InvalidSelector { .. } => "invalid_selector",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::Fetch { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ScrapeError::Fetch { url, .. }
            | ScrapeError::MalformedPage { url, .. }
            | ScrapeError::ListingShape { url, .. }
            | ScrapeError::IdMismatch { url, .. }
            | ScrapeError::UnlistedRecord { url, .. }
            | ScrapeError::DuplicateId { url, .. } => Some(url),
            _ => None,
        }
    }
}
