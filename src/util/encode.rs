fn is_unreserved(byte: u8) -> bool {
    matches!(byte, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~')
}

pub(crate) fn aws_percent_encode(input: &str) -> String {
    aws_percent_encode_impl(input, false)
}

pub(crate) fn aws_percent_encode_path(input: &str) -> String {
    aws_percent_encode_impl(input, true)
}

fn aws_percent_encode_impl(input: &str, preserve_slash: bool) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if is_unreserved(b) || (preserve_slash && b == b'/') {
            out.push(b as char);
            continue;
        }

        out.push('%');
        out.push(hex_upper(b >> 4));
        out.push(hex_upper(b & 0x0F));
    }
    out
}

fn hex_upper(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        10..=15 => (b'A' + (nibble - 10)) as char,
        _ => '0',
    }
}
