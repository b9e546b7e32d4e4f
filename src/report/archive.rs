use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::row::ReportRow;
use super::writer::{write_data_sheet, write_meta_sheet};
use super::ReportError;
use crate::config::DATASET_NAME;

/// Folder under the output directory holding dated and `latest` folders.
pub const REPORTS_DIR: &str = "reports";

/// Folder overwritten on every run with the newest files.
pub const LATEST_DIR: &str = "latest";

/// File names for one report date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFileNames {
    pub data: String,
    pub meta: String,
    pub archive: String,
}

impl ReportFileNames {
    pub fn for_stamp(stamp: &str) -> Self {
        Self {
            data: format!("{DATASET_NAME}_DATA_{stamp}.xls"),
            meta: format!("{DATASET_NAME}_META_{stamp}.xls"),
            archive: format!("{DATASET_NAME}_{stamp}.zip"),
        }
    }
}

/// Where a published report ended up.
#[derive(Debug, Clone)]
pub struct PublishedReport {
    pub stamp: String,
    pub dated_dir: PathBuf,
    pub latest_dir: PathBuf,
    pub names: ReportFileNames,
}

impl PublishedReport {
    pub fn dated_archive(&self) -> PathBuf {
        self.dated_dir.join(&self.names.archive)
    }

    pub fn latest_archive(&self) -> PathBuf {
        self.latest_dir.join(&self.names.archive)
    }
}

/// `YYYYMMDD` stamp used in folder and file names.
pub fn report_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Write DATA and META into `<output>/reports/<stamp>/`, archive both, and
/// copy all three into `<output>/reports/latest/`, replacing older copies.
pub fn publish_report(
    output_dir: &Path,
    row: &ReportRow,
    date: NaiveDate,
) -> Result<PublishedReport, ReportError> {
    let stamp = report_stamp(date);
    let names = ReportFileNames::for_stamp(&stamp);
    let reports = output_dir.join(REPORTS_DIR);
    let dated_dir = reports.join(&stamp);
    let latest_dir = reports.join(LATEST_DIR);
    fs::create_dir_all(&dated_dir)?;
    fs::create_dir_all(&latest_dir)?;

    let data_path = dated_dir.join(&names.data);
    let meta_path = dated_dir.join(&names.meta);
    let archive_path = dated_dir.join(&names.archive);

    write_data_sheet(&data_path, row)?;
    write_meta_sheet(&meta_path)?;
    create_archive(&archive_path, &[&data_path, &meta_path])?;

    for name in [&names.data, &names.meta, &names.archive] {
        fs::copy(dated_dir.join(name), latest_dir.join(name))?;
    }
    tracing::info!(
        dated = %dated_dir.display(),
        latest = %latest_dir.display(),
        "Report published"
    );

    Ok(PublishedReport {
        stamp,
        dated_dir,
        latest_dir,
        names,
    })
}

/// Deflated zip of `files`, each stored under its bare file name.
pub fn create_archive(archive_path: &Path, files: &[&Path]) -> Result<(), ReportError> {
    let mut zip = ZipWriter::new(File::create(archive_path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ReportError::InvalidPath(path.display().to_string()))?;
        zip.start_file(name, options)?;
        zip.write_all(&fs::read(path)?)?;
    }
    zip.finish()?;
    tracing::info!(path = %archive_path.display(), entries = files.len(), "Created archive");
    Ok(())
}
