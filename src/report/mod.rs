pub mod archive;
pub mod layout;
pub mod row;
pub mod writer;

pub use archive::*;
pub use layout::*;
pub use row::*;
pub use writer::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Report row has {found} cells, expected {expected}")]
    RowWidth { expected: usize, found: usize },

    #[error("Output path has no file name: {0}")]
    InvalidPath(String),
}
