use std::sync::LazyLock;

use regex::{Captures, Regex};

// Content stream region; both `stream\n...` and `stream...` openings occur.
static STREAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)stream\s*\n?(.*?)\n?endstream").unwrap());

// `(text)Tj` show operator, optional whitespace before the operator.
// The literal body is non-nested: the first `)` closes it.
static SHOW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)\s*Tj").unwrap());

// `[...]TJ` positioned-array show operator. The array body stays line-bound.
static SHOW_ARRAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]\s*TJ").unwrap());

// Parenthesized literal inside a TJ array body; the interspersed numeric
// offsets fall outside the parentheses and are ignored.
static ARRAY_LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

// `BT ... ET` text block.
static TEXT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)BT\s*(.*?)\s*ET").unwrap());

// Direct literal: 3+ raw characters, no backslash or closing paren in the body.
static DIRECT_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^\\)]{3,})\)").unwrap());

// `\NNN` octal escape, 1-3 digits.
static OCTAL_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\([0-7]{1,3})").unwrap());

// Any remaining backslash-escaped character.
static CHAR_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(.)").unwrap());

// Printable ASCII or whitespace only; anything else marks binary noise.
static PRINTABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\x20-\x7E\s]+$").unwrap());

static WHITESPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Best-effort plain-text recovery from raw PDF bytes, without parsing the
/// PDF object model.
///
/// Total over its input: malformed or non-PDF bytes degrade to an empty or
/// near-empty result instead of an error. Compressed (FlateDecode) streams
/// are invisible to the byte-level scan and contribute nothing, which is how
/// callers detect scanned or compressed documents via the length of the
/// returned text.
pub fn extract_text(bytes: &[u8]) -> String {
    let content = String::from_utf8_lossy(bytes);

    let mut fragments: Vec<String> = Vec::new();

    // Primary method: show operators inside `stream ... endstream` regions,
    // in document order. Duplicates within this pass are kept.
    for region in STREAM_RE.captures_iter(&content) {
        scan_stream(&region[1], &mut fragments);
    }

    // Secondary method: direct literals across the whole document, for PDFs
    // whose text sits outside recognizable stream markers. Exact duplicates
    // of anything already collected are skipped.
    for caps in DIRECT_LITERAL_RE.captures_iter(&content) {
        let text = decode_escapes(&caps[1]);
        if text.chars().count() > 3 && PRINTABLE_RE.is_match(&text) && !fragments.contains(&text) {
            fragments.push(text);
        }
    }

    assemble(&fragments)
}

/// Collect show-operator literals from one stream region: all `Tj` operands,
/// then all `TJ` array elements, then `Tj` operands inside each `BT..ET`
/// block. The text-block pass re-finds operands the first pass already saw;
/// that duplication is expected and not suppressed.
fn scan_stream(region: &str, fragments: &mut Vec<String>) {
    for caps in SHOW_RE.captures_iter(region) {
        push_if_visible(&caps[1], fragments);
    }
    for caps in SHOW_ARRAY_RE.captures_iter(region) {
        for literal in ARRAY_LITERAL_RE.captures_iter(&caps[1]) {
            push_if_visible(&literal[1], fragments);
        }
    }
    for block in TEXT_BLOCK_RE.captures_iter(region) {
        for caps in SHOW_RE.captures_iter(&block[1]) {
            push_if_visible(&caps[1], fragments);
        }
    }
}

/// Append the decoded literal unless it is blank after trimming.
fn push_if_visible(raw: &str, fragments: &mut Vec<String>) {
    let text = decode_escapes(raw);
    if !text.trim().is_empty() {
        fragments.push(text);
    }
}

/// Decode PDF string-literal escapes: the octal pass runs first, then the
/// single-character pass over its result. A backslash produced by the octal
/// pass is therefore visible to the character pass and consumes the
/// character after it.
fn decode_escapes(raw: &str) -> String {
    let octal_decoded = OCTAL_ESCAPE_RE.replace_all(raw, |caps: &Captures| {
        u32::from_str_radix(&caps[1], 8)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    CHAR_ESCAPE_RE
        .replace_all(&octal_decoded, |caps: &Captures| {
            match &caps[1] {
                "n" => "\n",
                "r" => "\r",
                "t" => "\t",
                "b" => "\u{8}",
                "f" => "\u{c}",
                // `\\`, `\(`, `\)` and any other `\X` decode to the escaped
                // character itself.
                other => return other.to_string(),
            }
            .to_string()
        })
        .into_owned()
}

/// Join fragments and normalize: stray literal `\n`/`\r`/`\t` two-character
/// pairs become control characters, whitespace runs collapse to single
/// spaces, NUL bytes are stripped, and the result is trimmed.
fn assemble(fragments: &[String]) -> String {
    let joined = fragments
        .iter()
        .map(|fragment| {
            fragment
                .replace("\\n", "\n")
                .replace("\\r", "\r")
                .replace("\\t", "\t")
        })
        .collect::<Vec<_>>()
        .join(" ");
    let collapsed = WHITESPACE_RUN_RE.replace_all(&joined, " ");
    collapsed.replace('\0', "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod extract_text {
        use super::*;

        #[test]
        fn empty_input() {
            assert_eq!(extract_text(b""), "");
        }

        #[test]
        fn arbitrary_bytes_never_fail() {
            let bytes: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
            let _ = extract_text(&bytes);
        }

        #[test]
        fn truncated_stream_yields_nothing_from_it() {
            // No closing `endstream`, so the primary method finds no region.
            assert_eq!(extract_text(b"%PDF-1.4\nstream\n(zz)Tj"), "");
        }

        #[test]
        fn stream_tj_operand() {
            let text = extract_text(b"stream\n(Hello World)Tj\nendstream");
            assert_eq!(text, "Hello World");
        }

        #[test]
        fn stream_without_newline_after_marker() {
            let text = extract_text(b"stream(Hello World)Tj endstream");
            assert_eq!(text, "Hello World");
        }

        #[test]
        fn tj_array_elements_stay_separate() {
            let text = extract_text(b"stream\n[(Hel)-20(lo)]TJ\nendstream");
            assert_eq!(text, "Hel lo");
            assert!(!text.contains("Hello"));
        }

        #[test]
        fn text_block_rescan_duplicates_operands() {
            // The BT..ET pass re-finds the Tj operand the plain pass saw.
            let text = extract_text(b"stream\nBT (Inside Block)Tj ET\nendstream");
            assert_eq!(text, "Inside Block Inside Block");
        }

        #[test]
        fn octal_escapes_in_stream_literal() {
            let text = extract_text(b"stream\n(\\101\\102\\103)Tj\nendstream");
            assert_eq!(text, "ABC");
        }

        #[test]
        fn direct_literals_deduplicate() {
            let text =
                extract_text(b"junk (Repeated Text Literal) junk (Repeated Text Literal) junk");
            assert_eq!(text, "Repeated Text Literal");
        }

        #[test]
        fn direct_scan_skips_fragments_already_collected() {
            let text = extract_text(
                b"stream\n(Shared Phrase)Tj\nendstream\nother (Shared Phrase) trailer",
            );
            assert_eq!(text, "Shared Phrase");
        }

        #[test]
        fn short_direct_literals_rejected() {
            assert_eq!(extract_text(b"1 0 obj (abc) endobj"), "");
            assert_eq!(extract_text(b"1 0 obj (ab) endobj"), "");
        }

        #[test]
        fn binary_direct_literals_rejected() {
            assert_eq!(extract_text(b"(ab\x01cdef)"), "");
        }

        #[test]
        fn binary_stream_yields_nothing() {
            let mut bytes = b"stream\n".to_vec();
            bytes.extend([0x78, 0x9c, 0x03, 0x00, 0x00, 0x01]);
            bytes.extend(b"\nendstream");
            assert_eq!(extract_text(&bytes), "");
        }

        #[test]
        fn nul_bytes_stripped_from_result() {
            let text = extract_text(b"stream\n(be\\000fore)Tj\nendstream");
            assert_eq!(text, "before");
        }

        #[test]
        fn end_to_end_chapter_snippet() {
            let bytes = b"stream\n(Photosynthesis is the process)Tj\n(by which plants make food.)Tj\nendstream";
            assert_eq!(
                extract_text(bytes),
                "Photosynthesis is the process by which plants make food."
            );
        }

        #[test]
        fn normalization_is_idempotent() {
            let bytes = b"stream\n(First   line)Tj\n( second line )Tj\nendstream";
            let text = extract_text(bytes);
            assert_eq!(assemble(&[text.clone()]), text);
        }
    }

    mod decode_escapes {
        use super::*;

        #[test]
        fn octal_digits() {
            assert_eq!(decode_escapes(r"\101\102\103"), "ABC");
        }

        #[test]
        fn standard_escapes() {
            assert_eq!(decode_escapes(r"Line1\nLine2"), "Line1\nLine2");
            assert_eq!(decode_escapes(r"a\tb"), "a\tb");
            assert_eq!(decode_escapes(r"\(paren\)"), "(paren)");
            assert_eq!(decode_escapes(r"back\\slash"), "back\\slash");
        }

        #[test]
        fn unknown_escape_drops_backslash() {
            assert_eq!(decode_escapes(r"\x\y"), "xy");
        }

        #[test]
        fn octal_backslash_feeds_character_pass() {
            // `\134` decodes to a backslash, which the second pass then
            // combines with the following `n`.
            assert_eq!(decode_escapes(r"\134n"), "\n");
        }
    }
}
