use quick_xml::{Reader, events::Event};

use crate::types;

/// Child elements of `<Error>` that map onto named `ErrorDetails` fields.
const KNOWN_ELEMENTS: [&str; 6] = [
    "Code",
    "Message",
    "Resource",
    "RequestId",
    "HostId",
    "FurtherDetails",
];

pub(crate) fn parse_error_xml(body: &str) -> Option<types::ErrorDetails> {
    if body.trim().is_empty() {
        return None;
    }

    let mut details = quick_xml::de::from_str::<types::XmlError>(body)
        .ok()
        .map(types::ErrorDetails::from)
        .filter(|details| details.code.is_some() || details.message.is_some())?;
    details.extra_details = extra_elements(body);
    Some(details)
}

/// Collects the leaf children of the root element that have no named field.
fn extra_elements(body: &str) -> Vec<(String, String)> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<(String, String)> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                depth += 1;
                if depth == 2 {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    current = Some((name, String::new()));
                } else if depth > 2 {
                    // Nested structure; not a flat detail.
                    current = None;
                }
            }
            Ok(Event::Empty(empty)) if depth == 1 => {
                let name = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                if !KNOWN_ELEMENTS.contains(&name.as_str()) {
                    out.push((name, String::new()));
                }
            }
            Ok(Event::Text(text)) if depth == 2 => {
                if let (Some((_, value)), Ok(text)) = (current.as_mut(), text.unescape()) {
                    value.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                if depth == 2 {
                    if let Some(entry) = current.take() {
                        if !KNOWN_ELEMENTS.contains(&entry.0.as_str()) {
                            out.push(entry);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}
