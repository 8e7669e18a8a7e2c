//! Minimal HTTP/1.1 server imitating a public S3 bucket for integration tests.
//!
//! `GET /?prefix=P[&marker=M]` returns a `ListBucketResult` of the matching
//! keys in sorted order; `GET /<key>` returns the object body.
//! [`BucketServerOptions`] switches on the failure modes the client must handle.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BucketServerOptions {
    /// Maximum keys per listing page; more keys set `IsTruncated`.
    pub page_size: usize,
    /// Status for listing requests (non-200 sends an S3 error document).
    pub listing_status: u16,
    /// If false, object responses omit `Content-Length` and end by closing the connection.
    pub send_content_length: bool,
    /// If false, every object request returns 404.
    pub serve_objects: bool,
    /// Object responses announce the full `Content-Length` but send only half the body.
    pub short_body: bool,
    /// `GET /<key>` answers 302 to `/redirected/<key>`, which serves the object.
    pub redirect_objects: bool,
    pub listing_quirk: ListingQuirk,
}

/// Malformed pagination served instead of a well-formed listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListingQuirk {
    #[default]
    None,
    /// `IsTruncated` is true but the page has no keys and no `NextMarker`.
    EmptyTruncated,
    /// Every page is truncated and names the same `NextMarker`.
    StuckMarker,
}

pub const STUCK_MARKER: &str = "stuck-marker";
const REDIRECT_BODY: &[u8] = b"object moved to /redirected/";

impl Default for BucketServerOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            listing_status: 200,
            send_content_length: true,
            serve_objects: true,
            short_body: false,
            redirect_objects: false,
            listing_quirk: ListingQuirk::None,
        }
    }
}

type Objects = BTreeMap<String, Vec<u8>>;

/// Starts a server in a background thread serving `objects`. Returns the base URL
/// (e.g. "http://127.0.0.1:12345/"). The server runs until the process exits.
pub fn start(objects: Vec<(&str, Vec<u8>)>) -> String {
    start_with_options(objects, BucketServerOptions::default())
}

pub fn start_with_options(objects: Vec<(&str, Vec<u8>)>, opts: BucketServerOptions) -> String {
    let objects: Objects = objects
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let objects = Arc::new(objects);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let objects = Arc::clone(&objects);
            thread::spawn(move || handle(stream, &objects, opts));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return None,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8(buf).ok()
}

fn handle(mut stream: TcpStream, objects: &Objects, opts: BucketServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let request = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let url = match url::Url::parse(&format!("http://localhost{}", target)) {
        Ok(u) => u,
        Err(_) => return respond(&mut stream, "400 Bad Request", b"", true),
    };

    if url.path() == "/" {
        if opts.listing_status != 200 {
            let body = b"<Error><Code>InternalError</Code><Message>boom</Message></Error>";
            let status = format!("{} Error", opts.listing_status);
            return respond(&mut stream, &status, body, true);
        }
        let query: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        let prefix = query.get("prefix").map(String::as_str).unwrap_or("");
        let marker = query.get("marker").map(String::as_str);
        let body = match opts.listing_quirk {
            ListingQuirk::None => listing_xml(objects, prefix, marker, opts.page_size),
            ListingQuirk::EmptyTruncated => quirk_xml(&[], None),
            ListingQuirk::StuckMarker => {
                let keys: Vec<&str> = objects
                    .keys()
                    .filter(|k| k.starts_with(prefix))
                    .map(String::as_str)
                    .collect();
                quirk_xml(&keys, Some(STUCK_MARKER))
            }
        };
        return respond(&mut stream, "200 OK", body.as_bytes(), true);
    }

    let path = url.path().trim_start_matches('/');
    let key = if opts.redirect_objects {
        match path.strip_prefix("redirected/") {
            Some(key) => key,
            None => {
                let location = format!("Location: /redirected/{}\r\n", path);
                return respond_with_headers(
                    &mut stream,
                    "302 Found",
                    &location,
                    REDIRECT_BODY,
                    REDIRECT_BODY.len(),
                    true,
                );
            }
        }
    } else {
        path
    };

    match objects.get(key) {
        Some(body) if opts.serve_objects && opts.short_body => {
            let sent = &body[..body.len() / 2];
            respond_with_headers(&mut stream, "200 OK", "", sent, body.len(), true)
        }
        Some(body) if opts.serve_objects => {
            respond(&mut stream, "200 OK", body, opts.send_content_length)
        }
        _ => respond(&mut stream, "404 Not Found", b"NoSuchKey", true),
    }
}

fn respond(stream: &mut TcpStream, status: &str, body: &[u8], content_length: bool) {
    respond_with_headers(stream, status, "", body, body.len(), content_length)
}

/// `headers` is zero or more complete `Name: value\r\n` lines. `announced` is
/// the `Content-Length` sent, which may differ from `body.len()`.
fn respond_with_headers(
    stream: &mut TcpStream,
    status: &str,
    headers: &str,
    body: &[u8],
    announced: usize,
    content_length: bool,
) {
    let length = if content_length {
        format!("Content-Length: {}\r\n", announced)
    } else {
        String::new()
    };
    let head = format!(
        "HTTP/1.1 {}\r\n{}{}Connection: close\r\n\r\n",
        status, headers, length
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn quirk_xml(keys: &[&str], next_marker: Option<&str>) -> String {
    let mut xml = String::from("<ListBucketResult><IsTruncated>true</IsTruncated>");
    if let Some(marker) = next_marker {
        xml.push_str(&format!("<NextMarker>{}</NextMarker>", marker));
    }
    for key in keys {
        xml.push_str(&format!("<Contents><Key>{}</Key></Contents>", key));
    }
    xml.push_str("</ListBucketResult>");
    xml
}

fn listing_xml(objects: &Objects, prefix: &str, marker: Option<&str>, page_size: usize) -> String {
    let matching: Vec<(&String, &Vec<u8>)> = objects
        .iter()
        .filter(|(k, _)| k.starts_with(prefix))
        .filter(|(k, _)| marker.map_or(true, |m| k.as_str() > m))
        .collect();
    let truncated = matching.len() > page_size;

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">",
    );
    xml.push_str("<Name>therock-nightly-tarball</Name>");
    xml.push_str(&format!("<Prefix>{}</Prefix>", prefix));
    xml.push_str(&format!("<Marker>{}</Marker>", marker.unwrap_or("")));
    xml.push_str(&format!("<MaxKeys>{}</MaxKeys>", page_size));
    xml.push_str(&format!("<IsTruncated>{}</IsTruncated>", truncated));
    for (key, body) in matching.into_iter().take(page_size) {
        xml.push_str(&format!(
            "<Contents><Key>{}</Key><LastModified>2024-01-01T00:00:00.000Z</LastModified><ETag>&quot;0&quot;</ETag><Size>{}</Size><StorageClass>STANDARD</StorageClass></Contents>",
            key,
            body.len()
        ));
    }
    xml.push_str("</ListBucketResult>");
    xml
}
