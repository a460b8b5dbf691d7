use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// A file as received from the upload form. Lives for one processing batch.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

/// Parsed document content, one entry per page. Text formats have one page.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub filename: String,
    pub kind: DocumentKind,
    pub pages: Vec<String>,
}

impl ParsedDocument {
    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.chars().count()).sum()
    }

    pub fn empty_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.trim().is_empty()).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub filename: String,
    pub pages: usize,
    pub chars: usize,
}

/// Concatenated text of one batch plus what each document contributed.
#[derive(Debug, Clone, Default)]
pub struct ExtractedText {
    pub text: String,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("could not read {filename}: {reason}")]
    Unreadable { filename: String, reason: String },
    #[error("unsupported file type for {filename}: .{extension}")]
    UnsupportedType { filename: String, extension: String },
}

pub fn detect_kind(doc: &UploadedDocument) -> Result<DocumentKind, ExtractError> {
    let ext = Path::new(&doc.filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        "txt" => Ok(DocumentKind::Text),
        "md" | "markdown" => Ok(DocumentKind::Markdown),
        _ if doc.bytes.starts_with(b"%PDF-") => Ok(DocumentKind::Pdf),
        _ => Err(ExtractError::UnsupportedType {
            filename: doc.filename.clone(),
            extension: ext,
        }),
    }
}

/// Parse one uploaded document into per-page plain text
pub fn parse_document(doc: &UploadedDocument) -> Result<ParsedDocument, ExtractError> {
    let kind = detect_kind(doc)?;
    let pages = match kind {
        DocumentKind::Text | DocumentKind::Markdown => {
            let content =
                String::from_utf8(doc.bytes.clone()).map_err(|e| ExtractError::Unreadable {
                    filename: doc.filename.clone(),
                    reason: e.to_string(),
                })?;
            vec![content]
        }
        DocumentKind::Pdf => extract_pdf_pages(&doc.bytes).map_err(|reason| {
            ExtractError::Unreadable {
                filename: doc.filename.clone(),
                reason,
            }
        })?,
    };

    Ok(ParsedDocument {
        filename: doc.filename.clone(),
        kind,
        pages,
    })
}

/// The PDF library panics on some malformed inputs; that is reported as an
/// unreadable document instead of tearing down the worker.
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(format!("PDF parse error: {}", e)),
        Err(_) => Err("PDF parser panicked on malformed input".into()),
    }
}

/// Concatenate the text of every page of every document, in upload order.
///
/// Pages are appended verbatim: nothing is deduplicated or normalized. Pages
/// with no extractable text contribute nothing and are reported at warn level.
/// The first unreadable document aborts the batch.
pub fn extract_text(documents: &[UploadedDocument]) -> Result<ExtractedText, ExtractError> {
    let mut extracted = ExtractedText::default();

    for doc in documents {
        let parsed = parse_document(doc)?;
        let empty = parsed.empty_pages();
        if empty > 0 {
            tracing::warn!(
                filename = %parsed.filename,
                empty_pages = empty,
                total_pages = parsed.pages.len(),
                "pages without extractable text"
            );
        }

        for page in &parsed.pages {
            extracted.text.push_str(page);
        }
        extracted.documents.push(DocumentSummary {
            filename: parsed.filename.clone(),
            pages: parsed.pages.len(),
            chars: parsed.char_count(),
        });
    }

    tracing::info!(
        documents = extracted.documents.len(),
        chars = extracted.text.chars().count(),
        "extracted document text"
    );
    Ok(extracted)
}
