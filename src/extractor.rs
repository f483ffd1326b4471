use std::{collections::HashMap, sync::LazyLock};

use clap::ValueEnum;

use crate::file_type;

pub mod pdf;

/// Kind of extraction a chapter input needs
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, serde::Serialize)]
pub enum Kind {
    /// Pass-through for plain text chapters
    #[value(name = "text")]
    PlainText,
    /// Built-in heuristic PDF text extractor
    #[value(name = "pdf")]
    PdfNative,
    #[value(skip)]
    Unsupported,
}

macro_rules! define_indices {
    (
        $(
            $variant:ident => {
                mime: [$( $mime:expr ),* $(,)?],
                ext: [$( $ext:expr ),* $(,)?] $(,)?
            }
        ),* $(,)?
    ) => {
        pub static MIME_INDEX: LazyLock<HashMap<file_type::Mime, Kind>> = LazyLock::new(|| {
            let mut map = HashMap::new();
            $(
                $( map.insert(file_type::Mime($mime.to_string()), Kind::$variant); )*
            )*
            map
        });

        pub static EXT_INDEX: LazyLock<HashMap<file_type::Extension, Kind>> = LazyLock::new(|| {
            let mut map = HashMap::new();
            $(
                $( map.insert(file_type::Extension($ext.to_string()), Kind::$variant); )*
            )*
            map
        });
    };
}

// Mapping indices for MIME types and file extensions to extractor kinds.
// Chapters arrive either as PDFs or as pasted/plain text.
define_indices! {
    PdfNative => {
        mime: ["application/pdf"],
        ext: ["pdf"],
    },
    PlainText => {
        mime: ["text/plain", "text/markdown"],
        ext: ["txt", "text", "md"],
    },
}
