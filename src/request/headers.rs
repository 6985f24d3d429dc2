use http::{HeaderName, HeaderValue};
use time::OffsetDateTime;

use crate::{
    types::{CannedAcl, MetadataDirective, Status},
    util::headers::{METADATA_PREFIX, copy_source_header_value, metadata_header_name},
};

/// Combined size limit for `x-amz-meta-*` request headers.
pub const MAX_METADATA_SIZE: usize = 2 * 1024;

/// Headers the engine or transport writes itself; callers may not set them.
const RESERVED: [&str; 7] = [
    "host",
    "content-length",
    "transfer-encoding",
    "date",
    "authorization",
    "user-agent",
    "x-amz-security-token",
];

/// Caller-supplied request headers.
///
/// Names are stored lowercased and are unique; setting a header twice keeps
/// the last value. Values are checked when the request is built, not here.
/// Headers the engine derives itself (`Host`, `Content-Length`, `Date`,
/// `Authorization`, `User-Agent`, the session token) are rejected then with
/// `Status::BadHeader`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    entries: Vec<(String, String)>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an arbitrary header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set(name.as_ref().trim().to_ascii_lowercase(), value.into());
        self
    }

    pub fn content_type(self, value: impl Into<String>) -> Self {
        self.header("content-type", value)
    }

    /// Base64-encoded MD5 of the request body.
    pub fn content_md5(self, value: impl Into<String>) -> Self {
        self.header("content-md5", value)
    }

    pub fn cache_control(self, value: impl Into<String>) -> Self {
        self.header("cache-control", value)
    }

    /// Sets `Content-Disposition: attachment; filename="..."`.
    pub fn content_disposition_filename(self, filename: impl AsRef<str>) -> Self {
        let value = format!("attachment; filename=\"{}\"", filename.as_ref());
        self.header("content-disposition", value)
    }

    pub fn content_encoding(self, value: impl Into<String>) -> Self {
        self.header("content-encoding", value)
    }

    pub fn expires(self, at: OffsetDateTime) -> Self {
        self.header("expires", crate::util::signing::http_date(at))
    }

    pub fn canned_acl(self, acl: CannedAcl) -> Self {
        self.header("x-amz-acl", acl.as_str())
    }

    /// Adds a user metadata entry, sent as `x-amz-meta-<name>`.
    pub fn metadata(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set(metadata_header_name(name.as_ref()), value.into());
        self
    }

    /// Source object of a copy operation.
    pub fn copy_source(self, bucket: &str, key: &str) -> Self {
        self.header("x-amz-copy-source", copy_source_header_value(bucket, key))
    }

    pub fn metadata_directive(self, directive: MetadataDirective) -> Self {
        self.header("x-amz-metadata-directive", directive.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, name: String, value: String) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Status> {
        let mut metadata_size = 0usize;
        for (name, value) in &self.entries {
            if HeaderName::from_bytes(name.as_bytes()).is_err()
                || HeaderValue::from_str(value).is_err()
            {
                return Err(Status::BadHeader);
            }
            if RESERVED.contains(&name.as_str()) {
                return Err(Status::BadHeader);
            }
            if name.starts_with(METADATA_PREFIX) {
                if name.len() == METADATA_PREFIX.len() {
                    return Err(Status::BadHeader);
                }
                metadata_size += name.len() + ": ".len() + value.len() + "\r\n".len();
            }
        }

        if metadata_size > MAX_METADATA_SIZE {
            return Err(Status::MetadataTooLong);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_values_replace_earlier_ones() {
        let headers = RequestHeaders::new()
            .content_type("text/plain")
            .header("Content-Type", "application/json");
        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.iter().count(), 1);
    }

    #[test]
    fn typed_setters_produce_wire_headers() {
        let headers = RequestHeaders::new()
            .canned_acl(CannedAcl::PublicRead)
            .metadata("Color", "blue")
            .content_disposition_filename("report.pdf")
            .copy_source("src", "a b")
            .metadata_directive(MetadataDirective::Replace);

        assert_eq!(headers.get("x-amz-acl"), Some("public-read"));
        assert_eq!(headers.get("x-amz-meta-color"), Some("blue"));
        assert_eq!(
            headers.get("content-disposition"),
            Some("attachment; filename=\"report.pdf\"")
        );
        assert_eq!(headers.get("x-amz-copy-source"), Some("/src/a%20b"));
        assert_eq!(headers.get("x-amz-metadata-directive"), Some("REPLACE"));
        assert!(headers.validate().is_ok());
    }

    #[test]
    fn rejects_line_breaks_and_bad_names() {
        let headers = RequestHeaders::new().header("x-custom", "a\r\nInjected: yes");
        assert_eq!(headers.validate(), Err(Status::BadHeader));

        let headers = RequestHeaders::new().header("bad name", "v");
        assert_eq!(headers.validate(), Err(Status::BadHeader));

        let headers = RequestHeaders::new().metadata("", "v");
        assert_eq!(headers.validate(), Err(Status::BadHeader));
    }

    #[test]
    fn rejects_headers_the_engine_sets() {
        for name in ["Host", "Content-Length", "date", "AUTHORIZATION", "User-Agent"] {
            let headers = RequestHeaders::new().header(name, "x");
            assert_eq!(headers.validate(), Err(Status::BadHeader), "{name}");
        }
        let headers = RequestHeaders::new().header("X-Amz-Security-Token", "t");
        assert_eq!(headers.validate(), Err(Status::BadHeader));

        let headers = RequestHeaders::new().header("x-amz-date", "Tue, 27 Mar 2007 19:36:42 +0000");
        assert!(headers.validate().is_ok());
    }

    #[test]
    fn rejects_oversized_metadata() {
        let headers = RequestHeaders::new().metadata("big", "v".repeat(MAX_METADATA_SIZE));
        assert_eq!(headers.validate(), Err(Status::MetadataTooLong));
    }
}
