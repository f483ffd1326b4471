use anyhow::Context;
use base64::Engine as _;
use clap::ValueEnum;

/// Upper bound for uploaded PDF payloads; enforced before extraction so the
/// byte-level scans stay bounded in time.
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

/// Minimum trimmed characters an extraction must yield to be usable
pub const MIN_CHAPTER_CHARS: usize = 50;

/// Character budget for chapter text sent with the main pack request
pub const CHAPTER_CHAR_BUDGET: usize = 15_000;

/// Character budget for the fallback important-questions request
pub const QUESTIONS_CHAR_BUDGET: usize = 12_000;

/// How a chapter input file should be interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Plain chapter text, used as-is
    #[value(name = "text")]
    Text,
    /// PDF file run through the built-in extractor
    #[value(name = "pdf")]
    Pdf,
    /// File holding a base64-encoded PDF payload
    #[value(name = "pdf-base64")]
    PdfBase64,
}

/// Reject PDF payloads above the size cap before any extraction work
pub fn ensure_pdf_size(len: usize) -> anyhow::Result<()> {
    if len > MAX_PDF_BYTES {
        return Err(anyhow::anyhow!(
            "PDF size must be less than {}MB",
            MAX_PDF_BYTES / (1024 * 1024)
        ));
    }
    Ok(())
}

/// Minimum-extraction gate shared by the extract and generate flows.
/// Under [`MIN_CHAPTER_CHARS`] trimmed characters the PDF is treated as
/// scanned/image-based; manual text entry is the only way forward.
pub fn ensure_readable(text: &str) -> anyhow::Result<()> {
    if text.trim().chars().count() < MIN_CHAPTER_CHARS {
        return Err(anyhow::anyhow!(
            "could not extract enough text from this PDF. \
             It may be a scanned or image-based PDF. \
             Please paste the chapter text instead."
        ));
    }
    Ok(())
}

/// Decode a base64 PDF payload. Line breaks and surrounding whitespace are
/// tolerated since payloads often arrive wrapped.
pub fn decode_base64_pdf(payload: &str) -> anyhow::Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .context("failed to decode base64 PDF payload")
}

/// Truncate to at most `budget` characters, on a character boundary
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
