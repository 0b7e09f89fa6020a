use core_types::{FileSize, FileType, MAX_UPLOAD_FILE_SIZE, TransportErrorCode};
use strum::IntoEnumIterator;

use crate::{SelectedFile, TransportError};

/// Checks applied to a file before any of its bytes are sent.
#[derive(Debug, Clone)]
pub struct FileFilters {
    pub max_file_size: FileSize,
    pub extensions: Vec<String>,
    pub prevent_duplicate: bool,
}

impl Default for FileFilters {
    fn default() -> Self {
        Self {
            max_file_size: MAX_UPLOAD_FILE_SIZE,
            extensions: FileType::iter().map(|t| t.extension()).collect(),
            prevent_duplicate: true,
        }
    }
}

impl FileFilters {
    pub fn with_max_file_size(mut self, max_file_size: FileSize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    /// `seen` holds the files accepted earlier; a file with the same name and size
    /// counts as a duplicate.
    pub fn check(&self, file: &SelectedFile, seen: &[SelectedFile]) -> Result<(), TransportError> {
        let extension_ok = file
            .name
            .rsplit_once('.')
            .map(|(_, ext)| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if !extension_ok {
            return Err(TransportError::Rejected {
                code: TransportErrorCode::FileExtension,
                message: "File extension error.".to_string(),
            });
        }

        if file.size > self.max_file_size {
            return Err(TransportError::Rejected {
                code: TransportErrorCode::FileSize,
                message: "File size error.".to_string(),
            });
        }

        if self.prevent_duplicate
            && seen
                .iter()
                .any(|s| s.name == file.name && s.size == file.size)
        {
            return Err(TransportError::Rejected {
                code: TransportErrorCode::FileDuplicate,
                message: "Duplicate file error.".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_supported_extensions() {
        let filters = FileFilters::default();
        for name in ["a.csv", "b.txt", "c.xls", "d.xlsx", "e.json", "F.CSV"] {
            let file = SelectedFile::new(name, format!("/tmp/{}", name), 10);
            assert!(filters.check(&file, &[]).is_ok(), "{} should pass", name);
        }
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let file = SelectedFile::new("report.pdf", "/tmp/report.pdf", 10);
        let err = FileFilters::default().check(&file, &[]).unwrap_err();
        assert_eq!(err.code(), TransportErrorCode::FileExtension);
    }

    #[test]
    fn test_rejects_oversized() {
        let filters = FileFilters::default().with_max_file_size(100);
        let file = SelectedFile::new("big.csv", "/tmp/big.csv", 101);
        assert_eq!(
            filters.check(&file, &[]).unwrap_err().code(),
            TransportErrorCode::FileSize
        );
    }

    #[test]
    fn test_rejects_duplicate() {
        let filters = FileFilters::default();
        let first = SelectedFile::new("a.csv", "/tmp/a.csv", 10);
        let again = SelectedFile::new("a.csv", "/other/a.csv", 10);
        assert_eq!(
            filters.check(&again, &[first.clone()]).unwrap_err().code(),
            TransportErrorCode::FileDuplicate
        );

        let relaxed = FileFilters {
            prevent_duplicate: false,
            ..FileFilters::default()
        };
        assert!(relaxed.check(&again, &[first]).is_ok());
    }
}
