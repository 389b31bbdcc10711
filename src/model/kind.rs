//! Classification of files by the rendering family that can turn them into PDF.

use std::fmt;
use std::path::Path;

/// Word-processor extensions.
const WORD_EXTENSIONS: &[&str] = &[
    "doc", "docx", "docm", "dot", "dotx", "dotm", "rtf", "odt", "txt",
];

/// Spreadsheet extensions.
const SPREADSHEET_EXTENSIONS: &[&str] = &[
    "xls", "xlsx", "xlsm", "xlsb", "xlt", "xltx", "xltm", "ods", "csv",
];

/// Presentation extensions.
const PRESENTATION_EXTENSIONS: &[&str] = &[
    "ppt", "pptx", "pptm", "pps", "ppsx", "pot", "potx", "odp",
];

/// The rendering family responsible for a file.
///
/// `MessageBody` is never inferred from an extension: it is requested
/// explicitly when a message itself is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Word,
    Spreadsheet,
    Presentation,
    MessageBody,
    Unsupported,
}

impl DocumentKind {
    /// Classify a file by its extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Self::Unsupported;
        };
        let matches = |list: &[&str]| list.iter().any(|e| e.eq_ignore_ascii_case(ext));

        if matches(WORD_EXTENSIONS) {
            Self::Word
        } else if matches(SPREADSHEET_EXTENSIONS) {
            Self::Spreadsheet
        } else if matches(PRESENTATION_EXTENSIONS) {
            Self::Presentation
        } else {
            Self::Unsupported
        }
    }

    /// Whether a backend exists for this kind.
    pub fn is_renderable(self) -> bool {
        self != Self::Unsupported
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Word => "word",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::MessageBody => "message",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// `true` if the file already is a PDF.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
