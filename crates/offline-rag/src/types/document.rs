//! Document records produced by the loader

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported source file kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, loaded page by page
    Pdf,
    /// Microsoft Word document (.docx), loaded as paragraphs
    Docx,
    /// Plain text file, loaded as paragraphs
    Txt,
}

impl FileType {
    /// Detect file type from extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Detect file type from a filename or path
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// One loaded source unit: a physical PDF page, or a whole flowing document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", try_from = "RawDocumentRecord")]
pub enum DocumentRecord {
    /// A single page of a paginated source
    Paged {
        text: String,
        filename: String,
        /// 1-based page number
        page: u32,
        total_pages: u32,
    },
    /// A document without page boundaries, in reading order
    Flowing {
        filename: String,
        /// Non-empty, trimmed paragraphs
        paragraphs: Vec<String>,
    },
}

impl DocumentRecord {
    /// Build a paged record, checking `1 <= page <= total_pages`
    pub fn paged(
        text: impl Into<String>,
        filename: impl Into<String>,
        page: u32,
        total_pages: u32,
    ) -> Result<Self> {
        let record = Self::Paged {
            text: text.into(),
            filename: filename.into(),
            page,
            total_pages,
        };
        record.validate()?;
        Ok(record)
    }

    /// Build a flowing record. Paragraphs are trimmed and empty ones dropped.
    pub fn flowing<I, S>(filename: impl Into<String>, paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paragraphs = paragraphs
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        Self::Flowing {
            filename: filename.into(),
            paragraphs,
        }
    }

    /// Source filename
    pub fn filename(&self) -> &str {
        match self {
            Self::Paged { filename, .. } | Self::Flowing { filename, .. } => filename,
        }
    }

    /// Number of whitespace-separated words in the record
    pub fn word_count(&self) -> usize {
        match self {
            Self::Paged { text, .. } => text.split_whitespace().count(),
            Self::Flowing { paragraphs, .. } => {
                paragraphs.iter().map(|p| p.split_whitespace().count()).sum()
            }
        }
    }

    /// Check the invariants of the record's variant
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Paged {
                filename,
                page,
                total_pages,
                ..
            } => {
                if *page == 0 {
                    return Err(Error::malformed(filename, "page numbers start at 1"));
                }
                if *total_pages == 0 {
                    return Err(Error::malformed(filename, "total_pages must be at least 1"));
                }
                if page > total_pages {
                    return Err(Error::malformed(
                        filename,
                        format!("page {} exceeds total_pages {}", page, total_pages),
                    ));
                }
            }
            Self::Flowing {
                filename,
                paragraphs,
            } => {
                if let Some(pos) = paragraphs.iter().position(|p| p.trim().is_empty()) {
                    return Err(Error::malformed(
                        filename,
                        format!("paragraph {} is empty", pos + 1),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Loosely-typed record as it arrives over the wire.
///
/// The `kind` tag selects the variant; the fields that variant requires
/// must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocumentRecord {
    pub kind: Option<String>,
    pub filename: Option<String>,
    pub text: Option<String>,
    pub page: Option<u32>,
    pub total_pages: Option<u32>,
    pub paragraphs: Option<Vec<String>>,
}

impl TryFrom<RawDocumentRecord> for DocumentRecord {
    type Error = Error;

    fn try_from(raw: RawDocumentRecord) -> Result<Self> {
        let filename = raw
            .filename
            .ok_or_else(|| Error::malformed("<unnamed>", "missing field 'filename'"))?;

        let missing = |field: &str| Error::malformed(&filename, format!("missing field '{}'", field));

        let record = match raw.kind.as_deref() {
            Some("paged") => DocumentRecord::Paged {
                text: raw.text.ok_or_else(|| missing("text"))?,
                page: raw.page.ok_or_else(|| missing("page"))?,
                total_pages: raw.total_pages.ok_or_else(|| missing("total_pages"))?,
                filename,
            },
            Some("flowing") => DocumentRecord::Flowing {
                paragraphs: raw.paragraphs.ok_or_else(|| missing("paragraphs"))?,
                filename,
            },
            Some(other) => {
                return Err(Error::malformed(
                    &filename,
                    format!("unknown record kind '{}'", other),
                ))
            }
            None => return Err(missing("kind")),
        };

        record.validate()?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("report.PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_filename("notes.docx"), Some(FileType::Docx));
        assert_eq!(FileType::from_filename("a.b.txt"), Some(FileType::Txt));
        assert_eq!(FileType::from_filename("sheet.xlsx"), None);
        assert_eq!(FileType::from_filename("README"), None);
    }

    #[test]
    fn test_paged_invariants() {
        assert!(DocumentRecord::paged("text", "a.pdf", 1, 1).is_ok());
        assert!(DocumentRecord::paged("text", "a.pdf", 0, 3).is_err());
        assert!(DocumentRecord::paged("text", "a.pdf", 4, 3).is_err());
        assert!(DocumentRecord::paged("text", "a.pdf", 1, 0).is_err());
    }

    #[test]
    fn test_flowing_drops_empty_paragraphs() {
        let record = DocumentRecord::flowing("a.docx", ["  first  ", "", "   ", "second"]);
        match record {
            DocumentRecord::Flowing { paragraphs, .. } => {
                assert_eq!(paragraphs, vec!["first", "second"]);
            }
            _ => panic!("expected flowing record"),
        }
    }

    #[test]
    fn test_deserialize_tagged() {
        let record: DocumentRecord = serde_json::from_str(
            r#"{"kind":"paged","text":"hello","filename":"a.pdf","page":2,"total_pages":3}"#,
        )
        .unwrap();
        assert_eq!(record.filename(), "a.pdf");
        assert_eq!(record.word_count(), 1);
    }

    #[test]
    fn test_missing_variant_field_is_malformed() {
        let raw = RawDocumentRecord {
            kind: Some("paged".into()),
            filename: Some("a.pdf".into()),
            text: Some("hello".into()),
            total_pages: Some(3),
            ..Default::default()
        };
        let err = DocumentRecord::try_from(raw).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
        assert!(err.to_string().contains("page"));
    }

    #[test]
    fn test_blank_paragraph_is_malformed() {
        let raw = RawDocumentRecord {
            kind: Some("flowing".into()),
            filename: Some("a.docx".into()),
            paragraphs: Some(vec!["one".into(), "  ".into()]),
            ..Default::default()
        };
        assert!(DocumentRecord::try_from(raw).is_err());
    }
}
