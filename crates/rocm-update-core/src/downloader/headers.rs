//! Classify raw response header lines delivered by curl.

/// What a single header line tells the downloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeaderLine {
    /// `HTTP/...` status line; starts a new response (e.g. after a redirect).
    Status,
    ContentLength(u64),
    Other,
}

pub(crate) fn classify(line: &str) -> HeaderLine {
    let line = line.trim();
    if line.starts_with("HTTP/") {
        return HeaderLine::Status;
    }
    if let Some((name, value)) = line.split_once(':') {
        if name.trim().eq_ignore_ascii_case("content-length") {
            if let Ok(n) = value.trim().parse::<u64>() {
                return HeaderLine::ContentLength(n);
            }
        }
    }
    HeaderLine::Other
}
