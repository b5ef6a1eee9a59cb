//! Inline citation markers.
//!
//! A marker is a block reference of the shape `((<noteId> "<anchor>"))`. The
//! anchor is everything after the first space, quotes included, so a freshly
//! generated marker carries the anchor `"<link>"`.

use memchr::{memchr, memchr2, memmem};

const OPEN: &[u8] = b"((";
const CLOSE: &[u8] = b"))";
const QUOTED_CLOSE: &[u8] = b"\"))";

/// A marker found in block content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker<'a> {
    /// Byte offset of the opening `((`.
    pub offset: usize,
    /// Byte length of the whole marker, delimiters included.
    pub len: usize,
    /// Text before the first space.
    pub note_id: &'a str,
    /// Text after the first space (empty if there is none).
    pub anchor: &'a str,
}
impl Marker<'_> {
    /// Whether the anchor already shows `link`.
    pub fn shows(&self, link: &str) -> bool {
        self.anchor.len() == link.len() + 2
            && self.anchor.starts_with('"')
            && self.anchor.ends_with('"')
            && &self.anchor[1..self.anchor.len() - 1] == link
    }
}

/// Scan `content` for markers, left to right.
///
/// Matching is non-greedy and never spans a line break. A quoted anchor ends
/// at the first `"))` after its opening quote, so link text containing `))`
/// stays inside the marker. Any other marker ends at the first `))`. An
/// unterminated `((` is skipped and scanning resumes one byte later, so a
/// marker opening inside it is still found.
pub fn parse(content: &str) -> Vec<Marker<'_>> {
    let bytes = content.as_bytes();
    let mut markers = Vec::new();
    let mut from = 0;
    while let Some(found) = memmem::find(&bytes[from..], OPEN) {
        let start = from + found;
        let inner_start = start + OPEN.len();
        let line_end = memchr2(b'\n', b'\r', &bytes[inner_start..]).map_or(bytes.len(), |n| inner_start + n);
        let line = &bytes[inner_start..line_end];
        let Some(mut close) = memmem::find(line, CLOSE) else {
            from = start + 1;
            continue;
        };
        if let Some(space) = memchr(b' ', &line[..close])
            && line.get(space + 1) == Some(&b'"')
            && let Some(quoted) = memmem::find(&line[space + 2..], QUOTED_CLOSE)
        {
            close = space + 2 + quoted + 1;
        }
        let inner_end = inner_start + close;
        let inner = &content[inner_start..inner_end];
        let (note_id, anchor) = inner.split_once(' ').unwrap_or((inner, ""));
        markers.push(Marker {
            offset: start,
            len: inner_end + CLOSE.len() - start,
            note_id,
            anchor,
        });
        from = inner_end + CLOSE.len();
    }
    markers
}

/// Format a marker pointing at `note_id` showing `link`.
pub fn format_marker(note_id: &str, link: &str) -> String {
    format!("(({note_id} \"{link}\"))")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parses_marker() {
        let content = r#"As shown ((20240101-abc "[1] Doe")) before."#;
        let markers = parse(content);
        assert_eq!(markers.len(), 1);
        let marker = markers[0];
        assert_eq!(marker.note_id, "20240101-abc");
        assert_eq!(marker.anchor, "\"[1] Doe\"");
        assert_eq!(&content[marker.offset..marker.offset + marker.len], r#"((20240101-abc "[1] Doe"))"#);
        assert!(marker.shows("[1] Doe"));
        assert!(!marker.shows("[2] Doe"));
    }

    #[rstest]
    #[case("((a \"x\")) and ((b \"y\"))", vec!["a", "b"])]
    #[case("((a \"x\"\n)) ((b \"y\"))", vec!["b"])]
    #[case("(((a x)))", vec!["(a"])]
    #[case("(( unclosed ((b 'y'))", vec![""])]
    #[case("((solo))", vec!["solo"])]
    #[case("no markers (here)", vec![])]
    #[case("((a \"(b))\")) ((c \"y\"))", vec!["a", "c"])]
    #[case("((solo)) \"x\"))", vec!["solo"])]
    fn test_marker_note_ids(#[case] content: &str, #[case] expected: Vec<&str>) {
        let ids: Vec<&str> = parse(content).iter().map(|m| m.note_id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_quoted_anchor_may_contain_closing_parens() {
        let content = r#"See ((id1 "[1] (Things (Revised))")) here."#;
        let markers = parse(content);
        assert_eq!(markers.len(), 1);
        assert_eq!(&content[markers[0].offset..markers[0].offset + markers[0].len], r#"((id1 "[1] (Things (Revised))"))"#);
        assert!(markers[0].shows("[1] (Things (Revised))"));
    }

    #[test]
    fn test_unterminated_quote_falls_back_to_first_close() {
        let markers = parse(r#"((id1 "open)) tail"#);
        assert_eq!(markers[0].anchor, "\"open");
    }

    #[test]
    fn test_marker_without_anchor() {
        let markers = parse("((solo))");
        assert_eq!(markers[0].anchor, "");
        assert!(!markers[0].shows(""));
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let formatted = format_marker("n1", "[3] Roe");
        let markers = parse(&formatted);
        assert_eq!(markers[0].note_id, "n1");
        assert!(markers[0].shows("[3] Roe"));
    }
}
