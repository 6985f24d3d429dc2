pub(crate) const METADATA_PREFIX: &str = "x-amz-meta-";

pub(crate) fn metadata_header_name(key: &str) -> String {
    let key = key.trim();
    let mut name = String::with_capacity(METADATA_PREFIX.len() + key.len());
    name.push_str(METADATA_PREFIX);
    name.push_str(&key.to_ascii_lowercase());
    name
}

pub(crate) fn copy_source_header_value(bucket: &str, key: &str) -> String {
    let bucket_enc = crate::util::encode::aws_percent_encode(bucket);
    let key_enc = crate::util::encode::aws_percent_encode_path(key);
    format!("/{bucket_enc}/{key_enc}")
}

pub(crate) fn is_success(http_response_code: u16) -> bool {
    (200..=299).contains(&http_response_code)
}
