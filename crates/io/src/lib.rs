// File I/O: source tables in, report files out

pub mod csv;
pub mod xlsx;

use std::path::Path;

use stockrecon_recon::model::Table;

/// How a source file is parsed, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" | "tsv" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }
}

/// Read any supported source file into a [`Table`].
pub fn read_table(path: &Path) -> Result<Table, String> {
    match SourceFormat::from_path(path) {
        Some(SourceFormat::Delimited) => csv::read_table(path),
        Some(SourceFormat::Spreadsheet) => xlsx::read_table(path, None),
        None => Err(format!(
            "{}: unsupported file type (expected csv, tsv, txt, xlsx, xlsm, xls, xlsb or ods)",
            path.display()
        )),
    }
}
