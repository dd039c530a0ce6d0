//! Document loading for ingestion.

use std::fs;
use std::io::Read;
use std::path::Path;

/// Extensions accepted as ingestable documents.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text", "rst"];

/// Check whether a path looks like a supported text document.
///
/// Falls back to sniffing the first bytes for NUL when the extension is
/// unknown, so extension-less notes still ingest.
pub fn is_supported_document(path: &Path) -> bool {
    if let Some(ext) = path.extension() {
        let ext = ext.to_string_lossy().to_lowercase();
        return TEXT_EXTENSIONS.contains(&ext.as_str());
    }

    if let Ok(file) = fs::File::open(path) {
        let mut buffer = [0u8; 512];
        let mut reader = std::io::BufReader::new(file);
        if let Ok(n) = reader.read(&mut buffer) {
            return !buffer[..n].contains(&0);
        }
    }

    false
}

/// Read a document's text content with a size cap.
pub fn read_document(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file exceeds maximum size: {} > {}", metadata.len(), max_size),
        ));
    }

    fs::read_to_string(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_supported_extensions() {
        assert!(is_supported_document(Path::new("notes.md")));
        assert!(is_supported_document(Path::new("notes.txt")));
        assert!(!is_supported_document(Path::new("binary.exe")));
        assert!(!is_supported_document(Path::new("report.pdf")));
    }

    #[test]
    fn test_read_document_respects_size_cap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();

        assert!(read_document(file.path(), 4).is_err());
        assert_eq!(read_document(file.path(), 1024).unwrap(), "hello world");
    }
}
