//! File loading: PDF pages, DOCX paragraphs, TXT lines

use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::{DocumentRecord, FileType, IngestWarning};

/// Records loaded from a batch of files, plus the files that were skipped
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Records in file order, then page order
    pub records: Vec<DocumentRecord>,
    /// Files that produced at least one record
    pub files_loaded: usize,
    /// Files that could not be loaded
    pub warnings: Vec<IngestWarning>,
}

impl LoadReport {
    /// Record one file's outcome. Per-file failures become warnings; any
    /// other error aborts the load.
    fn absorb(&mut self, filename: &str, result: Result<Vec<DocumentRecord>>) -> Result<()> {
        match result {
            Ok(records) => {
                if !records.is_empty() {
                    self.files_loaded += 1;
                }
                tracing::debug!("Loaded {} record(s) from {}", records.len(), filename);
                self.records.extend(records);
                Ok(())
            }
            Err(e) if e.is_per_file() => {
                tracing::warn!("Skipping {}: {}", filename, e);
                self.warnings.push(IngestWarning {
                    filename: filename.to_string(),
                    error: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Loader for the supported file kinds
pub struct FileLoader;

impl FileLoader {
    /// Load one file's bytes into document records
    pub fn load_bytes(filename: &str, data: &[u8]) -> Result<Vec<DocumentRecord>> {
        let file_type = FileType::from_filename(filename).ok_or_else(|| {
            let ext = filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            Error::UnsupportedFileType(format!("'{}' ({})", ext, filename))
        })?;

        match file_type {
            FileType::Pdf => Self::load_pdf(filename, data),
            FileType::Docx => Self::load_docx(filename, data),
            FileType::Txt => Ok(vec![Self::load_text(filename, data)]),
        }
    }

    /// Load every supported file directly inside `dir`, sorted by name.
    ///
    /// Unsupported extensions are ignored; unreadable or corrupt files are
    /// reported as warnings.
    pub fn load_directory(dir: &Path) -> Result<LoadReport> {
        if !dir.is_dir() {
            return Err(Error::config(format!(
                "Data directory does not exist: {}",
                dir.display()
            )));
        }

        let mut report = LoadReport::default();

        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file());

        for entry in entries {
            let filename = entry.file_name().to_string_lossy().to_string();

            if FileType::from_filename(&filename).is_none() {
                tracing::debug!("Ignoring unsupported file: {}", filename);
                continue;
            }

            let result = std::fs::read(entry.path())
                .map_err(Error::from)
                .and_then(|data| Self::load_bytes(&filename, &data));
            report.absorb(&filename, result)?;
        }

        Ok(report)
    }

    /// Load in-memory files (e.g. uploads) in the given order
    pub fn load_files<'a, I>(files: I) -> Result<LoadReport>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut report = LoadReport::default();
        for (filename, data) in files {
            report.absorb(filename, Self::load_bytes(filename, data))?;
        }
        Ok(report)
    }

    /// One paged record per page with extractable text
    #[cfg(feature = "pdf")]
    fn load_pdf(filename: &str, data: &[u8]) -> Result<Vec<DocumentRecord>> {
        let pages = match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
                page_numbers
                    .iter()
                    .map(|&n| {
                        let text = doc.extract_text(&[n]).unwrap_or_else(|e| {
                            tracing::debug!("No text on page {} of {}: {}", n, filename, e);
                            String::new()
                        });
                        (n, text)
                    })
                    .collect::<Vec<_>>()
            }
            Err(e) => {
                // lopdf rejects some files pdf-extract can still read; those
                // lose their page structure and count as a single page
                tracing::debug!("lopdf failed on {} ({}), falling back to pdf-extract", filename, e);
                let text = pdf_extract::extract_text_from_mem(data)
                    .map_err(|e| Error::file_parse(filename, e.to_string()))?;
                vec![(1, text)]
            }
        };

        let total_pages = pages.len() as u32;
        let mut records = Vec::new();

        for (page, text) in pages {
            if text.trim().is_empty() {
                continue;
            }
            records.push(DocumentRecord::paged(text, filename, page, total_pages)?);
        }

        if records.is_empty() {
            tracing::warn!("{} has no extractable text", filename);
        }

        Ok(records)
    }

    #[cfg(not(feature = "pdf"))]
    fn load_pdf(filename: &str, _data: &[u8]) -> Result<Vec<DocumentRecord>> {
        Err(Error::UnsupportedFileType(format!(
            "'pdf' ({}) - built without the pdf feature",
            filename
        )))
    }

    /// One flowing record holding the document's non-empty paragraphs
    #[cfg(feature = "docx")]
    fn load_docx(filename: &str, data: &[u8]) -> Result<Vec<DocumentRecord>> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();

        for child in &doc.document.children {
            // tables and section properties carry no body paragraphs
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                push_paragraph_text(&p.children, &mut text);
                paragraphs.push(text);
            }
        }

        Ok(vec![DocumentRecord::flowing(filename, paragraphs)])
    }

    #[cfg(not(feature = "docx"))]
    fn load_docx(filename: &str, _data: &[u8]) -> Result<Vec<DocumentRecord>> {
        Err(Error::UnsupportedFileType(format!(
            "'docx' ({}) - built without the docx feature",
            filename
        )))
    }

    /// Plain text: every non-blank line is a paragraph
    fn load_text(filename: &str, data: &[u8]) -> DocumentRecord {
        let content = String::from_utf8_lossy(data);
        DocumentRecord::flowing(filename, content.lines())
    }
}

/// Append the visible text of a paragraph's runs, descending into hyperlinks.
/// Tabs and line breaks separate words.
#[cfg(feature = "docx")]
fn push_paragraph_text(children: &[docx_rs::ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    match child {
                        docx_rs::RunChild::Text(t) => out.push_str(&t.text),
                        docx_rs::RunChild::Tab(_) | docx_rs::RunChild::Break(_) => out.push(' '),
                        _ => {}
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => push_paragraph_text(&link.children, out),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_flowing() {
        let records =
            FileLoader::load_bytes("notes.txt", b"First line.\n\n   \n  Second line  \r\nThird").unwrap();

        assert_eq!(records.len(), 1);
        match &records[0] {
            DocumentRecord::Flowing {
                filename,
                paragraphs,
            } => {
                assert_eq!(filename, "notes.txt");
                assert_eq!(paragraphs, &vec!["First line.", "Second line", "Third"]);
            }
            other => panic!("expected flowing record, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileLoader::load_bytes("sheet.xlsx", b"").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_corrupt_files_are_parse_errors() {
        let err = FileLoader::load_bytes("broken.docx", b"not a zip archive").unwrap_err();
        assert!(err.is_per_file());

        let err = FileLoader::load_bytes("broken.pdf", b"definitely not a pdf").unwrap_err();
        assert!(err.is_per_file());
    }

    #[test]
    fn test_load_files_continues_after_failure() {
        let files: Vec<(&str, &[u8])> = vec![
            ("a.txt", &b"alpha beta"[..]),
            ("broken.docx", &b"garbage"[..]),
            ("b.txt", &b"gamma"[..]),
        ];
        let report = FileLoader::load_files(files).unwrap();

        assert_eq!(report.files_loaded, 2);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].filename, "broken.docx");
    }

    #[test]
    fn test_non_file_errors_abort_the_load() {
        let mut report = LoadReport::default();
        report
            .absorb("a.pdf", Err(Error::file_parse("a.pdf", "bad xref")))
            .unwrap();
        assert_eq!(report.warnings.len(), 1);

        let err = report
            .absorb("b.pdf", Err(Error::malformed("b.pdf", "page 0")))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_load_directory_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second file").unwrap();
        std::fs::write(dir.path().join("a.TXT"), "first file").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(dir.path().join("bad.pdf"), "not a pdf").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.txt"), "ignored").unwrap();

        let report = FileLoader::load_directory(dir.path()).unwrap();

        let names: Vec<&str> = report.records.iter().map(|r| r.filename()).collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].filename, "bad.pdf");
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            FileLoader::load_directory(&missing),
            Err(Error::Config(_))
        ));
    }

    #[cfg(feature = "pdf")]
    fn three_page_pdf(pages: [&str; 3]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 3,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_pages_keep_numbers_and_skip_blank() {
        let data = three_page_pdf(["Budget approved in March", "", "Launch moved to Friday"]);
        let records = FileLoader::load_bytes("report.pdf", &data).unwrap();

        assert_eq!(records.len(), 2);
        let pages: Vec<(u32, u32)> = records
            .iter()
            .map(|r| match r {
                DocumentRecord::Paged {
                    page, total_pages, ..
                } => (*page, *total_pages),
                other => panic!("expected paged record, got {:?}", other),
            })
            .collect();
        assert_eq!(pages, vec![(1, 3), (3, 3)]);

        match &records[1] {
            DocumentRecord::Paged { text, filename, .. } => {
                assert_eq!(filename, "report.pdf");
                assert!(text.contains("Friday"));
            }
            other => panic!("expected paged record, got {:?}", other),
        }
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_docx_paragraphs() {
        use docx_rs::{Docx, Hyperlink, HyperlinkType, Paragraph, Run};

        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Quarterly summary")))
            .add_paragraph(Paragraph::new())
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("revenue").add_tab().add_text("grew")),
            )
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("see").add_tab())
                    .add_hyperlink(
                        Hyperlink::new("https://example.com/report", HyperlinkType::External)
                            .add_run(Run::new().add_text("appendix")),
                    ),
            )
            .build()
            .pack(&mut buf)
            .unwrap();

        let records = FileLoader::load_bytes("summary.docx", buf.get_ref()).unwrap();

        assert_eq!(records.len(), 1);
        match &records[0] {
            DocumentRecord::Flowing {
                filename,
                paragraphs,
            } => {
                assert_eq!(filename, "summary.docx");
                assert_eq!(
                    paragraphs,
                    &vec!["Quarterly summary", "revenue grew", "see appendix"]
                );
            }
            other => panic!("expected flowing record, got {:?}", other),
        }
    }
}
