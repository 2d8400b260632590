// src/intake/validation.rs
use crate::utils::{get_file_extension, validate_file_extension};

pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["json", "txt", "md", "pdf", "doc", "docx"];

pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> Option<String> {
        get_file_extension(&self.name)
    }

    pub fn is_json(&self) -> bool {
        self.extension().as_deref() == Some("json")
    }
}

pub fn validate_file(file: &FileUpload) -> bool {
    validate_file_with_limit(file, MAX_FILE_SIZE)
}

pub fn validate_file_with_limit(file: &FileUpload, max_size: u64) -> bool {
    validate_file_extension(&file.name, &ACCEPTED_EXTENSIONS).is_ok() && file.size() <= max_size
}

/// `http://` or `https://` followed by something with a host.
pub fn validate_url(url: &str) -> bool {
    let url = url.trim();
    let lower = url.to_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return false;
    }

    reqwest::Url::parse(url)
        .map(|parsed| parsed.host_str().is_some_and(|host| !host.is_empty()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_listed_types() {
        for name in ["a.json", "b.TXT", "c.md", "d.pdf", "e.doc", "f.docx"] {
            assert!(validate_file(&FileUpload::new(name, vec![b'x'])), "{}", name);
        }
    }

    #[test]
    fn test_rejects_other_types_and_oversize() {
        assert!(!validate_file(&FileUpload::new("photo.png", vec![0])));
        assert!(!validate_file(&FileUpload::new("README", vec![0])));

        let big = FileUpload::new("big.txt", vec![b'a'; (MAX_FILE_SIZE + 1) as usize]);
        assert!(!validate_file(&big));

        let exact = FileUpload::new("exact.txt", vec![b'a'; MAX_FILE_SIZE as usize]);
        assert!(validate_file(&exact));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/jobs/1"));
        assert!(validate_url("  HTTP://example.com  "));
        assert!(!validate_url("example.com/jobs"));
        assert!(!validate_url("ftp://example.com"));
        assert!(!validate_url("https://"));
        assert!(!validate_url(""));
    }
}
