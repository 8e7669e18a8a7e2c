//! Typed failures for bucket listing requests.

use thiserror::Error;

/// A listing or object request that could not be completed. Always fatal for a run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (DNS, connect, timeout, TLS, ...).
    #[error("request to {url} failed")]
    Curl {
        url: String,
        #[source]
        source: curl::Error,
    },
    /// HTTP response had a non-2xx status.
    #[error("GET {url} returned HTTP {code}")]
    Http { url: String, code: u32 },
    /// The body was not a usable bucket listing.
    #[error("invalid bucket listing")]
    Listing(#[from] ListingError),
}

/// Why a listing body could not be turned into keys.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("listing response has no root element")]
    Empty,
    #[error("malformed XML")]
    Xml(#[from] quick_xml::Error),
    #[error("listing is not valid UTF-8")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("unexpected root element <{0}>, expected <ListBucketResult>")]
    UnexpectedRoot(String),
    #[error("document ended inside <{0}>")]
    Unterminated(String),
    /// Truncated page without keys or `NextMarker`; continuing would loop forever.
    #[error("truncated listing gave no marker to continue from")]
    NoMarker,
}
