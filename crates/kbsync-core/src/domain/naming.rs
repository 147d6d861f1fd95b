//! File name and QName helpers
//!
//! Documents routed through the tagging pipeline are renamed with an
//! embedded timestamp marker so a restart can tell which copies were already
//! pushed back into the pipeline. Folder creation from logical paths needs
//! QName segment decoding (`cm:Knowledge_x0020_Base` → `Knowledge Base`).

use chrono::{DateTime, Utc};

/// Marker wrapped around the pipeline timestamp inside a file name
const TIMESTAMP_MARKER: &str = "_AI_TS_";

/// Number of digits in the embedded timestamp (yyyyMMddHHmmss)
const TIMESTAMP_DIGITS: usize = 14;

/// Removes any existing `_AI_TS_<digits>_AI_TS_` marker from a file name
pub fn strip_timestamp_marker(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(start) = rest.find(TIMESTAMP_MARKER) {
        let after_open = start + TIMESTAMP_MARKER.len();
        let digits_end = after_open + TIMESTAMP_DIGITS;
        let close_end = digits_end + TIMESTAMP_MARKER.len();
        // Byte-wise comparison: digits and marker are ASCII, so a match
        // guarantees every slice index below falls on a char boundary.
        // Multibyte text after a lookalike marker must not panic.
        let bytes = rest.as_bytes();
        let is_marker = bytes.len() >= close_end
            && bytes[after_open..digits_end]
                .iter()
                .all(u8::is_ascii_digit)
            && &bytes[digits_end..close_end] == TIMESTAMP_MARKER.as_bytes();
        if is_marker {
            out.push_str(&rest[..start]);
            rest = &rest[close_end..];
        } else {
            out.push_str(&rest[..after_open]);
            rest = &rest[after_open..];
        }
    }
    out.push_str(rest);
    out
}

/// Inserts a fresh timestamp marker before the file extension
///
/// Any existing marker is stripped first, so repeated renames never stack
/// markers. `report.pdf` becomes `report_AI_TS_20250101120000_AI_TS_.pdf`.
pub fn append_timestamp_marker(base_name: &str, now: DateTime<Utc>) -> String {
    let clean = strip_timestamp_marker(base_name);
    let ts = now.format("%Y%m%d%H%M%S");
    match clean.rfind('.').filter(|idx| *idx > 0) {
        Some(idx) => {
            let (stem, ext) = clean.split_at(idx);
            format!("{stem}{TIMESTAMP_MARKER}{ts}{TIMESTAMP_MARKER}{ext}")
        }
        None => format!("{clean}{TIMESTAMP_MARKER}{ts}{TIMESTAMP_MARKER}"),
    }
}

/// Derives a node title from a file name by dropping the extension
pub fn title_from_file_name(name_with_ext: &str) -> &str {
    match name_with_ext.rfind('.').filter(|idx| *idx > 0) {
        Some(idx) => &name_with_ext[..idx],
        None => name_with_ext,
    }
}

/// Decodes a QName path segment to a human-readable folder name
///
/// Strips a leading `cm:` prefix and unescapes `_xHHHH_` sequences
/// (hex Unicode code points), so `cm:Knowledge_x0020_Base` becomes
/// `Knowledge Base`.
pub fn decode_qname_segment(segment: &str) -> String {
    let segment = segment.strip_prefix("cm:").unwrap_or(segment);
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(start) = rest.find("_x") {
        let hex_start = start + 2;
        let hex_end = hex_start + 4;
        let close = hex_end + 1;
        let decoded = if rest.len() >= close && rest.as_bytes()[hex_end] == b'_' {
            u32::from_str_radix(&rest[hex_start..hex_end], 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            None
        };
        match decoded {
            Some(c) => {
                out.push_str(&rest[..start]);
                out.push(c);
                rest = &rest[close..];
            }
            None => {
                out.push_str(&rest[..hex_start]);
                rest = &rest[hex_start..];
            }
        }
    }
    out.push_str(rest);
    out
}
