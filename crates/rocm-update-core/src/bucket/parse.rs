//! Parse an S3 `ListBucketResult` document into object keys.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::ListingError;

/// One page of a bucket listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// `Contents/Key` values in document order.
    pub keys: Vec<String>,
    /// True if the server cut the listing short (more pages follow).
    pub is_truncated: bool,
    /// `NextMarker`, only sent by S3 when a delimiter was requested.
    pub next_marker: Option<String>,
}

fn local_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Parse a listing body. Element names are matched by local name, so the
/// S3 namespace is accepted but not required.
pub(crate) fn parse_listing(body: &[u8]) -> Result<ListingPage, ListingError> {
    let xml = std::str::from_utf8(body)?;
    // Text is kept verbatim: S3 keys may begin or end with whitespace.
    let mut reader = Reader::from_str(xml);

    let mut page = ListingPage::default();
    let mut open: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                if open.is_empty() {
                    if name != "ListBucketResult" {
                        return Err(ListingError::UnexpectedRoot(name));
                    }
                    seen_root = true;
                }
                open.push(name);
                text.clear();
            }
            Event::Empty(e) => {
                if open.is_empty() {
                    let name = local_name(e.local_name().as_ref());
                    if name != "ListBucketResult" {
                        return Err(ListingError::UnexpectedRoot(name));
                    }
                    seen_root = true;
                }
            }
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(c) => text.push_str(std::str::from_utf8(&c)?),
            Event::End(_) => {
                let name = open.pop().unwrap_or_default();
                match (open.last().map(String::as_str), name.as_str()) {
                    (Some("Contents"), "Key") => page.keys.push(std::mem::take(&mut text)),
                    (Some("ListBucketResult"), "IsTruncated") => {
                        page.is_truncated = text.trim().eq_ignore_ascii_case("true");
                    }
                    (Some("ListBucketResult"), "NextMarker") if !text.is_empty() => {
                        page.next_marker = Some(std::mem::take(&mut text));
                    }
                    _ => {}
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(name) = open.pop() {
        return Err(ListingError::Unterminated(name));
    }
    if !seen_root {
        return Err(ListingError::Empty);
    }
    Ok(page)
}
