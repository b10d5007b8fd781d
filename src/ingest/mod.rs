mod sentences;

pub use sentences::split_sentences;

use crate::error::IngestError;
use chardetng::EncodingDetector;
use serde::Serialize;
use std::path::Path;

const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Txt,
}

impl FileKind {
    pub fn from_filename(filename: &str) -> Result<Self, IngestError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(FileKind::Pdf),
            "txt" => Ok(FileKind::Txt),
            _ => Err(IngestError::UnsupportedFileType(filename.to_string())),
        }
    }
}

/// Text extracted from an uploaded file.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub kind: FileKind,
    pub text: String,
    pub sentences: Vec<String>,
}

impl Document {
    pub fn from_upload(filename: &str, bytes: &[u8]) -> Result<Self, IngestError> {
        let kind = FileKind::from_filename(filename)?;
        let text = match kind {
            FileKind::Pdf => read_pdf(bytes)?,
            FileKind::Txt => read_txt(bytes),
        };

        let sentences = split_sentences(&text);
        if sentences.is_empty() {
            return Err(IngestError::Empty(filename.to_string()));
        }

        tracing::info!(
            "Extracted {} chars ({} sentences) from {}",
            text.chars().count(),
            sentences.len(),
            filename
        );

        Ok(Self {
            filename: filename.to_string(),
            kind,
            text,
            sentences,
        })
    }

    pub fn preview(&self) -> String {
        self.text.chars().take(PREVIEW_CHARS).collect()
    }

    /// Sentences joined by single spaces; this is what prompts embed.
    pub fn joined_text(&self) -> String {
        self.sentences.join(" ")
    }
}

pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
    match FileKind::from_filename(filename)? {
        FileKind::Pdf => read_pdf(bytes),
        FileKind::Txt => Ok(read_txt(bytes)),
    }
}

fn read_pdf(bytes: &[u8]) -> Result<String, IngestError> {
    // pdf-extract panics on some malformed documents instead of erroring
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(result) => result.map_err(|e| IngestError::Pdf(e.to_string())),
        Err(_) => Err(IngestError::Pdf("document could not be parsed".to_string())),
    }
}

/// Decodes plain text in whatever encoding it was saved in.
fn read_txt(bytes: &[u8]) -> String {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!("Decoding as {} replaced malformed sequences", used.name());
    } else {
        tracing::debug!("Decoded text upload as {}", used.name());
    }
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_filename() {
        assert_eq!(FileKind::from_filename("notes.TXT").unwrap(), FileKind::Txt);
        assert_eq!(FileKind::from_filename("paper.pdf").unwrap(), FileKind::Pdf);
        assert!(matches!(
            FileKind::from_filename("slides.docx"),
            Err(IngestError::UnsupportedFileType(_))
        ));
        assert!(FileKind::from_filename("README").is_err());
    }

    #[test]
    fn test_utf8_text_upload() {
        let doc = Document::from_upload("a.txt", "First one. Second one.".as_bytes()).unwrap();
        assert_eq!(doc.sentences, vec!["First one.", "Second one."]);
        assert_eq!(doc.joined_text(), "First one. Second one.");
    }

    #[test]
    fn test_legacy_encoding_is_detected() {
        let original = "这是一个用来测试编码检测的文本文件。我们希望系统能够自动识别文件的编码格式，\
            并且正确地把内容转换成统一的字符串。学生上传的讲义经常使用旧的中文编码保存。";
        let (encoded, _, _) = encoding_rs::GBK.encode(original);
        let text = extract_text("legacy.txt", &encoded).unwrap();
        assert_eq!(text, original);
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Hello there.".as_bytes());
        assert_eq!(extract_text("bom.txt", &bytes).unwrap(), "Hello there.");
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        assert!(matches!(
            Document::from_upload("blank.txt", b"  \n "),
            Err(IngestError::Empty(_))
        ));
    }

    #[test]
    fn test_invalid_pdf_is_rejected() {
        assert!(matches!(
            extract_text("broken.pdf", b"not a pdf"),
            Err(IngestError::Pdf(_))
        ));
    }

    #[test]
    fn test_preview_counts_chars() {
        let text = "字".repeat(600);
        let doc = Document::from_upload("long.txt", text.as_bytes()).unwrap();
        assert_eq!(doc.preview().chars().count(), 500);
    }
}
