//! Word-window chunking with page and paragraph tracking

use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::{ChunkRecord, DocumentRecord};

/// Validated window parameters, both measured in words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Create window parameters.
    ///
    /// Fails with a configuration error unless `0 <= overlap < chunk_size`;
    /// a non-positive stride would never advance the window.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than 0"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window width in words
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Words shared by consecutive windows
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive window starts
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Word ranges of every window over a sequence of `len` words.
    /// The last window is truncated to the sequence end.
    fn windows(&self, len: usize) -> impl Iterator<Item = Range<usize>> {
        let size = self.chunk_size;
        (0..len)
            .step_by(self.stride())
            .map(move |start| start..(start + size).min(len))
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            overlap: 128,
        }
    }
}

/// Chunk ID source for one chunking batch.
///
/// Each batch owns its counter, so IDs never leak between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkIdCounter {
    next: u64,
}

impl ChunkIdCounter {
    /// Counter starting at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter continuing an existing numbering
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// ID the next chunk will receive
    pub fn peek(&self) -> u64 {
        self.next
    }

    fn take(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

/// Sliding-window chunker over document records
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    params: ChunkParams,
}

impl Chunker {
    /// Create a chunker from validated parameters
    pub fn new(params: ChunkParams) -> Self {
        Self { params }
    }

    /// Create a chunker, validating the parameters
    pub fn with_sizes(chunk_size: usize, overlap: usize) -> Result<Self> {
        Ok(Self::new(ChunkParams::new(chunk_size, overlap)?))
    }

    /// Window parameters
    pub fn params(&self) -> ChunkParams {
        self.params
    }

    /// Chunk a batch of records with IDs starting at 0
    pub fn chunk(&self, records: &[DocumentRecord]) -> Result<Vec<ChunkRecord>> {
        let mut counter = ChunkIdCounter::new();
        self.chunk_with_counter(records, &mut counter)
    }

    /// Chunk a batch of records, drawing IDs from `counter`.
    ///
    /// Every record is validated before any chunk is built; on error the
    /// counter is left untouched and no chunks are returned.
    pub fn chunk_with_counter(
        &self,
        records: &[DocumentRecord],
        counter: &mut ChunkIdCounter,
    ) -> Result<Vec<ChunkRecord>> {
        for record in records {
            record.validate()?;
        }

        let mut ids = *counter;
        let mut chunks = Vec::new();

        for record in records {
            match record {
                DocumentRecord::Paged {
                    text,
                    filename,
                    page,
                    total_pages,
                } => self.chunk_paged(text, filename, *page, *total_pages, &mut ids, &mut chunks),
                DocumentRecord::Flowing {
                    filename,
                    paragraphs,
                } => self.chunk_flowing(paragraphs, filename, &mut ids, &mut chunks),
            }
        }

        *counter = ids;
        Ok(chunks)
    }

    fn chunk_paged(
        &self,
        text: &str,
        filename: &str,
        page: u32,
        total_pages: u32,
        ids: &mut ChunkIdCounter,
        out: &mut Vec<ChunkRecord>,
    ) {
        let words: Vec<&str> = text.split_whitespace().collect();

        for window in self.params.windows(words.len()) {
            out.push(ChunkRecord {
                chunk_text: words[window].join(" "),
                filename: filename.to_string(),
                chunk_id: ids.take(),
                source_ref: Some(format!("Page: {}", page)),
                page: Some(page),
                total_pages: Some(total_pages),
            });
        }
    }

    fn chunk_flowing(
        &self,
        paragraphs: &[String],
        filename: &str,
        ids: &mut ChunkIdCounter,
        out: &mut Vec<ChunkRecord>,
    ) {
        // owners[i] is the 1-based paragraph that words[i] came from
        let mut words: Vec<&str> = Vec::new();
        let mut owners: Vec<usize> = Vec::new();

        for (index, paragraph) in paragraphs.iter().enumerate() {
            for word in paragraph.split_whitespace() {
                words.push(word);
                owners.push(index + 1);
            }
        }

        for window in self.params.windows(words.len()) {
            // owners is non-decreasing, so the ends of the window bound it
            let first = owners[window.start];
            let last = owners[window.end - 1];

            out.push(ChunkRecord {
                chunk_text: words[window].join(" "),
                filename: filename.to_string(),
                chunk_id: ids.take(),
                source_ref: Some(paragraph_ref(first, last)),
                page: None,
                total_pages: None,
            });
        }
    }
}

/// Chunk `records` with a fresh counter
pub fn chunk_documents(
    records: &[DocumentRecord],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<ChunkRecord>> {
    Chunker::with_sizes(chunk_size, overlap)?.chunk(records)
}

fn paragraph_ref(first: usize, last: usize) -> String {
    if first == last {
        format!("Paragraph: {}", first)
    } else {
        format!("Paragraphs: {}-{}", first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn paged(text: &str, filename: &str, page: u32, total_pages: u32) -> DocumentRecord {
        DocumentRecord::paged(text, filename, page, total_pages).unwrap()
    }

    #[test]
    fn test_invalid_params() {
        assert!(matches!(ChunkParams::new(0, 0), Err(Error::Config(_))));
        assert!(matches!(ChunkParams::new(5, 5), Err(Error::Config(_))));
        assert!(matches!(ChunkParams::new(5, 7), Err(Error::Config(_))));
        assert_eq!(ChunkParams::new(5, 4).unwrap().stride(), 1);
        assert_eq!(ChunkParams::new(512, 128).unwrap().stride(), 384);
    }

    #[test]
    fn test_invalid_params_fail_before_chunking() {
        let records = vec![paged("a b c", "a.pdf", 1, 1)];
        assert!(chunk_documents(&records, 3, 3).is_err());
        assert!(chunk_documents(&records, 0, 0).is_err());
    }

    #[test]
    fn test_truncated_last_window_is_kept() {
        let records = vec![paged(&words(7), "a.pdf", 1, 1)];
        let chunks = chunk_documents(&records, 3, 1).unwrap();

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].chunk_text, "w0 w1 w2");
        assert_eq!(chunks[1].chunk_text, "w2 w3 w4");
        assert_eq!(chunks[2].chunk_text, "w4 w5 w6");
        assert_eq!(chunks[3].chunk_text, "w6");
    }

    #[test]
    fn test_flowing_paragraph_span() {
        let records = vec![DocumentRecord::flowing(
            "notes.docx",
            ["alpha beta gamma", "delta epsilon"],
        )];
        let chunks = chunk_documents(&records, 5, 2).unwrap();

        // starts at 0 and 3
        assert_eq!(chunks.len(), 2);

        assert_eq!(chunks[0].chunk_text, "alpha beta gamma delta epsilon");
        assert_eq!(chunks[0].source_ref.as_deref(), Some("Paragraphs: 1-2"));
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].page, None);
        assert_eq!(chunks[0].total_pages, None);

        assert_eq!(chunks[1].chunk_text, "delta epsilon");
        assert_eq!(chunks[1].source_ref.as_deref(), Some("Paragraph: 2"));
        assert_eq!(chunks[1].chunk_id, 1);
    }

    #[test]
    fn test_single_and_ranged_paragraph_refs() {
        let records = vec![DocumentRecord::flowing(
            "doc.docx",
            ["one two", "three four", "five six", "seven eight", "nine ten"],
        )];
        // windows: [0,2) [2,4) [4,6) [6,8) [8,10) without overlap
        let chunks = chunk_documents(&records, 2, 0).unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[2].chunk_text, "five six");
        assert_eq!(chunks[2].source_ref.as_deref(), Some("Paragraph: 3"));

        // a six-word window starting at word 2 covers paragraphs 2-4
        let chunks = chunk_documents(&records, 6, 4).unwrap();
        assert_eq!(chunks[1].chunk_text, "three four five six seven eight");
        assert_eq!(chunks[1].source_ref.as_deref(), Some("Paragraphs: 2-4"));
    }

    #[test]
    fn test_page_carry_through() {
        let records = vec![paged(&words(25), "report.pdf", 5, 20)];
        let chunks = chunk_documents(&records, 10, 3).unwrap();

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert_eq!(chunk.page, Some(5));
            assert_eq!(chunk.total_pages, Some(20));
            assert_eq!(chunk.source_ref.as_deref(), Some("Page: 5"));
            assert_eq!(chunk.filename, "report.pdf");
        }
    }

    #[test]
    fn test_ids_global_across_records() {
        let records = vec![
            paged(&words(7), "a.pdf", 1, 2),
            paged(&words(4), "a.pdf", 2, 2),
            DocumentRecord::flowing("b.docx", ["x y z", "u v"]),
        ];
        let chunks = chunk_documents(&records, 3, 1).unwrap();

        let ids: Vec<u64> = chunks.iter().map(|c| c.chunk_id).collect();
        let expected: Vec<u64> = (0..chunks.len() as u64).collect();
        assert_eq!(ids, expected);

        // record order, then window order
        let pages: Vec<Option<u32>> = chunks.iter().map(|c| c.page).collect();
        assert_eq!(
            pages,
            vec![Some(1), Some(1), Some(1), Some(1), Some(2), Some(2), None, None, None]
        );
    }

    #[test]
    fn test_counter_scoped_to_call() {
        let records = vec![paged(&words(5), "a.pdf", 1, 1)];
        let first = chunk_documents(&records, 2, 0).unwrap();
        let second = chunk_documents(&records, 2, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(second[0].chunk_id, 0);
    }

    #[test]
    fn test_counter_continuation() {
        let chunker = Chunker::with_sizes(2, 0).unwrap();
        let mut counter = ChunkIdCounter::starting_at(10);
        let chunks = chunker
            .chunk_with_counter(&[paged(&words(3), "a.pdf", 1, 1)], &mut counter)
            .unwrap();

        assert_eq!(chunks[0].chunk_id, 10);
        assert_eq!(chunks[1].chunk_id, 11);
        assert_eq!(counter.peek(), 12);
    }

    #[test]
    fn test_coverage_by_stride() {
        let text = words(23);
        let original: Vec<&str> = text.split_whitespace().collect();
        let params = ChunkParams::new(6, 2).unwrap();
        let chunks = Chunker::new(params)
            .chunk(&[paged(&text, "a.pdf", 1, 1)])
            .unwrap();

        // the leading `stride` words of each window tile the sequence exactly
        let rebuilt: Vec<String> = chunks
            .iter()
            .flat_map(|c| {
                c.chunk_text
                    .split(' ')
                    .take(params.stride())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(rebuilt, original);

        // every interior word is covered ceil-or-floor of size/stride times
        let mut coverage = vec![0usize; original.len()];
        for (i, range) in params.windows(original.len()).enumerate() {
            assert_eq!(chunks[i].chunk_text.split(' ').count(), range.len());
            for idx in range {
                coverage[idx] += 1;
            }
        }
        assert!(coverage.iter().all(|&c| c >= 1));
        assert_eq!(coverage[0], 1);
        assert_eq!(coverage[4], 2); // inside the overlap of windows 0 and 1
    }

    #[test]
    fn test_no_cross_record_mixing() {
        let records = vec![
            paged("a1 a2 a3", "a.pdf", 1, 1),
            DocumentRecord::flowing("b.txt", ["b1 b2", "b3"]),
        ];
        let chunks = chunk_documents(&records, 4, 1).unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].chunk_text.split(' ').all(|w| w.starts_with('a')));
        assert!(chunks[1].chunk_text.split(' ').all(|w| w.starts_with('b')));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(chunk_documents(&[], 5, 1).unwrap().is_empty());

        let records = vec![
            paged("   \n\t ", "blank.pdf", 1, 2),
            DocumentRecord::flowing("empty.docx", Vec::<String>::new()),
            paged("only words", "a.pdf", 2, 2),
        ];
        let chunks = chunk_documents(&records, 5, 1).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, 0);
        assert_eq!(chunks[0].chunk_text, "only words");
    }

    #[test]
    fn test_whitespace_normalized() {
        let records = vec![paged("one\n\ntwo\tthree   four", "a.pdf", 1, 1)];
        let chunks = chunk_documents(&records, 10, 0).unwrap();
        assert_eq!(chunks[0].chunk_text, "one two three four");
    }

    #[test]
    fn test_malformed_record_aborts_whole_call() {
        let records = vec![
            paged("fine text", "a.pdf", 1, 1),
            DocumentRecord::Paged {
                text: "bad".into(),
                filename: "b.pdf".into(),
                page: 3,
                total_pages: 2,
            },
        ];

        let chunker = Chunker::with_sizes(5, 1).unwrap();
        let mut counter = ChunkIdCounter::new();
        let err = chunker.chunk_with_counter(&records, &mut counter).unwrap_err();

        assert!(matches!(err, Error::MalformedDocument { .. }));
        assert_eq!(counter.peek(), 0);
    }
}
