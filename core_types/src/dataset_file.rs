use serde::{Deserialize, Serialize};

use crate::{CoreTypeError, FileType};

/// A sheet name paired with its selection flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSelection {
    pub name: String,
    pub selected: bool,
}

/// Builds the selection list 1:1 from the sheet names. Nothing starts out selected.
pub fn derive_selected_sheets(sheets: &[String]) -> Vec<SheetSelection> {
    sheets
        .iter()
        .map(|name| SheetSelection {
            name: name.clone(),
            selected: false,
        })
        .collect()
}

/// The file a dataset is being created from.
///
/// `file_key` stays empty until the server has accepted an upload. `sheets` and
/// `selected_sheets` are only populated for workbook types once processing is done.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub filename: String,
    pub filepath: String,
    pub file_key: String,
    pub delimiter: String,
    pub sheets: Vec<String>,
    selected_sheets: Vec<SheetSelection>,
    pub sheet_name: String,
    pub sheet_index: usize,
}

impl FileDescriptor {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }

    pub fn with_file_key(mut self, file_key: impl Into<String>) -> Self {
        self.file_key = file_key.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Replaces the sheet list and rebuilds the selections from it.
    pub fn with_sheets(mut self, sheets: Vec<String>) -> Self {
        self.set_sheets(sheets);
        self
    }

    pub fn file_type(&self) -> Result<FileType, CoreTypeError> {
        FileType::from_filename(&self.filename)
    }

    pub fn selected_sheets(&self) -> &[SheetSelection] {
        &self.selected_sheets
    }

    /// Replaces the sheet list. The selections are always rederived, never edited on their own.
    pub fn set_sheets(&mut self, sheets: Vec<String>) {
        self.sheets = sheets;
        self.refresh_selected_sheets();
    }

    pub fn refresh_selected_sheets(&mut self) {
        self.selected_sheets = derive_selected_sheets(&self.sheets);
    }

    /// Points the descriptor at sheet `index`. Out of range indexes are rejected while
    /// the sheet list is non-empty.
    pub fn set_sheet_index(&mut self, index: usize) -> Result<(), CoreTypeError> {
        if !self.sheets.is_empty() && index >= self.sheets.len() {
            return Err(CoreTypeError::ConversionError(format!(
                "Sheet index {} out of range for {} sheets",
                index,
                self.sheets.len()
            )));
        }
        self.sheet_index = index;
        self.sheet_name = self.sheets.get(index).cloned().unwrap_or_default();
        Ok(())
    }

    pub fn has_delimiter(&self) -> bool {
        !self.delimiter.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_selected_sheets() {
        let sheets = vec!["Sheet1".to_string(), "Sheet2".to_string()];
        assert_eq!(
            derive_selected_sheets(&sheets),
            vec![
                SheetSelection {
                    name: "Sheet1".to_string(),
                    selected: false
                },
                SheetSelection {
                    name: "Sheet2".to_string(),
                    selected: false
                },
            ]
        );
        assert!(derive_selected_sheets(&[]).is_empty());
    }

    #[test]
    fn test_set_sheets_rederives_selection() {
        let mut descriptor = FileDescriptor::new("book.xlsx").with_sheets(vec!["A".into()]);
        assert_eq!(descriptor.selected_sheets().len(), 1);

        descriptor.set_sheets(vec!["X".into(), "Y".into(), "Z".into()]);
        let names: Vec<_> = descriptor
            .selected_sheets()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_set_sheet_index_bounds() {
        let mut descriptor =
            FileDescriptor::new("book.xlsx").with_sheets(vec!["A".into(), "B".into()]);
        descriptor.set_sheet_index(1).unwrap();
        assert_eq!(descriptor.sheet_name, "B");
        assert!(descriptor.set_sheet_index(2).is_err());
        assert_eq!(descriptor.sheet_index, 1);

        let mut csv = FileDescriptor::new("data.csv");
        csv.set_sheet_index(0).unwrap();
        assert_eq!(csv.sheet_name, "");
    }

    #[test]
    fn test_descriptor_file_type() {
        assert_eq!(
            FileDescriptor::new("data.json").file_type().unwrap(),
            FileType::Json
        );
        assert!(FileDescriptor::new("data.exe").file_type().is_err());
    }
}
