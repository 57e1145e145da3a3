//! Catalog feed reader.
//!
//! Parses the external XML export (one repeated `<book>` element per
//! catalog item) into [`FeedRecord`]s. Feed files come from external
//! providers and are not trusted to be clean UTF-8: the raw bytes are
//! decoded as a legacy 8-bit encoding (ISO-8859-1), and every text value
//! is additionally forced through a lossy pass so encoding faults degrade
//! to best-effort text instead of failing the run.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::models::FeedRecord;

/// Feed parse failure. Malformed markup is fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to read feed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed feed XML: {0}")]
    Parse(#[from] quick_xml::Error),
}

/// A parsed catalog feed.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    /// Records in feed order. Records without a key are not included.
    pub records: Vec<FeedRecord>,
    /// Count of item elements skipped because their key field was missing
    /// or empty. Reported as a warning by the caller, never fatal.
    pub skipped: usize,
}

impl Feed {
    /// Read and parse a feed file.
    pub fn parse_file(path: &Path) -> Result<Feed, FeedError> {
        let bytes = std::fs::read(path).map_err(|source| FeedError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_bytes(&bytes)
    }

    /// Parse feed bytes. The input is decoded as ISO-8859-1 first, so any
    /// byte sequence yields *some* document; only structural XML errors
    /// are fatal.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Feed, FeedError> {
        let text = decode_latin1(bytes);
        Self::parse_str(&text)
    }

    fn parse_str(xml: &str) -> Result<Feed, FeedError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut records = Vec::new();
        let mut skipped = 0usize;
        let mut current: Option<FeedRecord> = None;
        // Name of the child element whose text we are inside, if any.
        let mut field: Option<Vec<u8>> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    if name == b"book" {
                        current = Some(FeedRecord::default());
                    } else if current.is_some() {
                        field = Some(name);
                    }
                }
                Event::Text(t) => {
                    if let (Some(record), Some(name)) = (current.as_mut(), field.as_ref()) {
                        let value = safe_decode(t.unescape().ok().as_deref(), t.as_ref());
                        assign_field(record, name, value);
                    }
                }
                // CDATA carries raw markup (HTML descriptions); no unescaping.
                Event::CData(t) => {
                    if let (Some(record), Some(name)) = (current.as_mut(), field.as_ref()) {
                        let value = safe_decode(None, t.as_ref());
                        assign_field(record, name, value);
                    }
                }
                Event::End(e) => {
                    if e.local_name().as_ref() == b"book" {
                        if let Some(record) = current.take() {
                            if record.key.is_empty() {
                                skipped += 1;
                            } else {
                                records.push(record);
                            }
                        }
                    } else {
                        field = None;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Feed { records, skipped })
    }
}

/// Decode bytes as ISO-8859-1. Every byte maps to the Unicode scalar of
/// the same value, so this never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Best-effort text decoding: a failed XML unescape falls back to a lossy
/// UTF-8 view of the raw bytes, and absent text yields an empty string.
fn safe_decode(unescaped: Option<&str>, raw: &[u8]) -> String {
    match unescaped {
        Some(s) => s.to_string(),
        None => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn assign_field(record: &mut FeedRecord, name: &[u8], value: String) {
    match name {
        b"isbn" => record.key = value,
        b"title" => record.title = Some(value),
        b"price" => record.price = Some(value),
        b"stock" => record.stock = Some(value),
        b"longdesc" => record.description = Some(value),
        b"content" => record.short_description = Some(value),
        b"multicat" => record.categories = Some(value),
        b"subject" => record.tags = Some(value),
        b"thumbnailL" => record.image_url = Some(value),
        b"author" => record.author = Some(value),
        b"publisher" => record.publisher = Some(value),
        b"cover" => record.format = Some(value),
        b"pages" => record.pages = Some(value),
        b"lang" => record.language = Some(value),
        b"dimensions" => record.dimensions = Some(value),
        b"weight" => record.weight = Some(value),
        b"pub_date" => record.publication_date = Some(value),
        // Unknown child elements are ignored.
        _ => {}
    }
}
