use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub mod local;
pub mod memory;

pub use local::LocalFileStorage;
pub use memory::InMemoryFileStorage;

/// Route prefix under which public blobs are served
pub const PUBLIC_FILES_ROUTE: &str = "/files";

/// RFC 3986 unreserved characters pass through, everything else is %XX
const KEY_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Public URL for a key: `<base>/files/<key>`, each key segment percent-encoded
pub fn public_url_for(public_base_url: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| utf8_percent_encode(segment, KEY_SEGMENT).to_string())
        .collect();
    format!(
        "{}{}/{}",
        public_base_url.trim_end_matches('/'),
        PUBLIC_FILES_ROUTE,
        encoded.join("/")
    )
}
