use std::net::IpAddr;

use crate::types::{Protocol, Status, UriStyle};

/// Longest host name accepted for the service endpoint.
pub const MAX_HOSTNAME_SIZE: usize = 255;
/// Longest bucket name accepted.
pub const MAX_BUCKET_NAME_SIZE: usize = 255;
/// Longest object key accepted, in bytes before encoding.
pub const MAX_KEY_SIZE: usize = 1024;
/// Capacity of the request URI buffer.
pub const MAX_URI_SIZE: usize = "https:///".len()
    + MAX_HOSTNAME_SIZE
    + MAX_BUCKET_NAME_SIZE
    + 1
    + 3 * MAX_KEY_SIZE
    + "?torrent".len()
    + 1;

#[derive(Clone, Copy, Debug)]
pub(crate) struct UriTarget<'a> {
    pub(crate) protocol: Protocol,
    pub(crate) uri_style: UriStyle,
    pub(crate) host: &'a str,
    pub(crate) bucket: Option<&'a str>,
    pub(crate) key: Option<&'a str>,
    pub(crate) sub_resource: Option<&'a str>,
    pub(crate) query_params: Option<&'a str>,
}

#[derive(Debug)]
pub(crate) struct ComposedUri {
    pub(crate) uri: String,
    /// Resource string covered by the request signature.
    pub(crate) canonical_resource: String,
}

/// Fixed-capacity URI builder; refuses to grow past [`MAX_URI_SIZE`].
struct UriBuffer {
    buf: String,
}

impl UriBuffer {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(MAX_URI_SIZE),
        }
    }

    fn push(&mut self, part: &str) -> Result<(), Status> {
        if self.buf.len() + part.len() > MAX_URI_SIZE {
            return Err(Status::UriTooLong);
        }
        self.buf.push_str(part);
        Ok(())
    }
}

pub(crate) fn compose_uri(target: &UriTarget<'_>) -> Result<ComposedUri, Status> {
    let bucket = target.bucket.filter(|b| !b.is_empty());
    let sub_resource = target.sub_resource.filter(|s| !s.is_empty());
    let query_params = target.query_params.filter(|q| !q.is_empty());
    let key = target.key.unwrap_or("");

    if key.len() > MAX_KEY_SIZE {
        return Err(Status::KeyTooLong);
    }
    if let Some(bucket) = bucket {
        validate_bucket(bucket, target.uri_style)?;
    }

    let encoded_key = crate::util::encode::aws_percent_encode_path(key);

    let mut uri = UriBuffer::new();
    uri.push(target.protocol.scheme())?;
    uri.push("://")?;
    match (bucket, target.uri_style) {
        (Some(bucket), UriStyle::VirtualHost) => {
            uri.push(bucket)?;
            uri.push(".")?;
            uri.push(target.host)?;
        }
        (Some(bucket), UriStyle::Path) => {
            uri.push(target.host)?;
            uri.push("/")?;
            uri.push(bucket)?;
        }
        (None, _) => uri.push(target.host)?,
    }
    uri.push("/")?;
    uri.push(&encoded_key)?;
    if let Some(sub_resource) = sub_resource {
        uri.push("?")?;
        uri.push(sub_resource)?;
    }
    if let Some(query_params) = query_params {
        uri.push(if sub_resource.is_some() { "&" } else { "?" })?;
        uri.push(query_params)?;
    }

    let mut canonical_resource = String::with_capacity(encoded_key.len() + 64);
    if let Some(bucket) = bucket {
        canonical_resource.push('/');
        canonical_resource.push_str(bucket);
    }
    canonical_resource.push('/');
    canonical_resource.push_str(&encoded_key);
    if let Some(sub_resource) = sub_resource {
        canonical_resource.push('?');
        canonical_resource.push_str(sub_resource);
    }

    Ok(ComposedUri {
        uri: uri.buf,
        canonical_resource,
    })
}

fn validate_bucket(bucket: &str, style: UriStyle) -> Result<(), Status> {
    if bucket.len() > MAX_BUCKET_NAME_SIZE || bucket.contains(['/', '?', '#']) {
        return Err(Status::InvalidBucketName);
    }
    if style == UriStyle::VirtualHost && !is_dns_compatible_bucket(bucket) {
        return Err(Status::InvalidBucketName);
    }
    Ok(())
}

fn is_dns_compatible_bucket(bucket: &str) -> bool {
    let bytes = bucket.as_bytes();
    if bytes.len() < 3 || bytes.len() > 63 {
        return false;
    }

    if bytes.iter().any(|b| b.is_ascii_uppercase()) {
        return false;
    }

    let is_allowed = |b: u8| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.');
    if !bytes.iter().all(|&b| is_allowed(b)) {
        return false;
    }

    let starts_ok = matches!(bytes[0], b'a'..=b'z' | b'0'..=b'9');
    let ends_ok = matches!(bytes[bytes.len() - 1], b'a'..=b'z' | b'0'..=b'9');
    if !starts_ok || !ends_ok {
        return false;
    }

    if bucket.contains("..") {
        return false;
    }

    if bucket.parse::<IpAddr>().is_ok() {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target<'a>(bucket: Option<&'a str>, key: Option<&'a str>, style: UriStyle) -> UriTarget<'a> {
        UriTarget {
            protocol: Protocol::Https,
            uri_style: style,
            host: "s3.amazonaws.com",
            bucket,
            key,
            sub_resource: None,
            query_params: None,
        }
    }

    #[test]
    fn composes_virtual_host_uri() {
        let composed =
            compose_uri(&target(Some("my-bucket"), Some("a+b"), UriStyle::VirtualHost)).unwrap();
        assert_eq!(composed.uri, "https://my-bucket.s3.amazonaws.com/a%2Bb");
        assert_eq!(composed.canonical_resource, "/my-bucket/a%2Bb");
    }

    #[test]
    fn composes_path_style_uri() {
        let mut t = target(Some("My_Bucket"), Some("dir/file.txt"), UriStyle::Path);
        t.protocol = Protocol::Http;
        let composed = compose_uri(&t).unwrap();
        assert_eq!(composed.uri, "http://s3.amazonaws.com/My_Bucket/dir/file.txt");
        assert_eq!(composed.canonical_resource, "/My_Bucket/dir/file.txt");
    }

    #[test]
    fn service_level_uri_has_root_resource() {
        let composed = compose_uri(&target(None, None, UriStyle::VirtualHost)).unwrap();
        assert_eq!(composed.uri, "https://s3.amazonaws.com/");
        assert_eq!(composed.canonical_resource, "/");
    }

    #[test]
    fn sub_resource_is_signed_but_query_params_are_not() {
        let mut t = target(Some("bucket"), None, UriStyle::Path);
        t.sub_resource = Some("acl");
        t.query_params = Some("versionId=3");
        let composed = compose_uri(&t).unwrap();
        assert_eq!(composed.uri, "https://s3.amazonaws.com/bucket/?acl&versionId=3");
        assert_eq!(composed.canonical_resource, "/bucket/?acl");

        t.sub_resource = None;
        let composed = compose_uri(&t).unwrap();
        assert_eq!(composed.uri, "https://s3.amazonaws.com/bucket/?versionId=3");
    }

    #[test]
    fn rejects_uri_past_capacity() {
        let query = "x".repeat(MAX_URI_SIZE);
        let mut t = target(Some("bucket"), Some("key"), UriStyle::Path);
        t.query_params = Some(&query);
        assert_eq!(compose_uri(&t).unwrap_err(), Status::UriTooLong);
    }

    #[test]
    fn longest_key_still_fits() {
        let key = "\u{1}".repeat(MAX_KEY_SIZE);
        let bucket = "b".repeat(63);
        let composed = compose_uri(&target(Some(&bucket), Some(&key), UriStyle::VirtualHost));
        assert!(composed.is_ok());
    }

    #[test]
    fn rejects_oversized_key_and_bad_buckets() {
        let key = "k".repeat(MAX_KEY_SIZE + 1);
        assert_eq!(
            compose_uri(&target(Some("bucket"), Some(&key), UriStyle::Path)).unwrap_err(),
            Status::KeyTooLong
        );
        assert_eq!(
            compose_uri(&target(Some("Not_Dns"), None, UriStyle::VirtualHost)).unwrap_err(),
            Status::InvalidBucketName
        );
        assert_eq!(
            compose_uri(&target(Some("a/b"), None, UriStyle::Path)).unwrap_err(),
            Status::InvalidBucketName
        );
    }
}
