use std::path::Path;

use rust_xlsxwriter::{ColNum, RowNum, Workbook};
use serde::Serialize;

use super::layout::{
    code_mnemonic, metadata_common, ColumnKind, COLUMN_CODES, COLUMN_COUNT, COLUMN_DESCRIPTIONS,
};
use super::row::ReportRow;
use super::ReportError;

/// META sheet header, in column order.
pub const META_HEADERS: [&str; 18] = [
    "CODE",
    "CODE_MNEMONIC",
    "DESCRIPTION",
    "FREQUENCY",
    "MULTIPLIER",
    "AGGREGATION_TYPE",
    "UNIT_TYPE",
    "DATA_TYPE",
    "DATA_UNIT",
    "SEASONALLY_ADJUSTED",
    "ANNUALIZED",
    "STATE",
    "PROVIDER_MEASURE_URL",
    "PROVIDER",
    "SOURCE",
    "SOURCE_DESCRIPTION",
    "COUNTRY",
    "DATASET",
];

/// One META row, describing one data column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct MetaRow {
    pub code: String,
    pub code_mnemonic: String,
    pub description: String,
    pub frequency: String,
    pub multiplier: u8,
    pub aggregation_type: String,
    pub unit_type: String,
    pub data_type: String,
    pub data_unit: String,
    pub seasonally_adjusted: String,
    pub annualized: String,
    pub state: String,
    pub provider_measure_url: String,
    pub provider: String,
    pub source: String,
    pub source_description: String,
    pub country: String,
    pub dataset: String,
}

impl MetaRow {
    fn cells(&self) -> Vec<String> {
        vec![
            self.code.clone(),
            self.code_mnemonic.clone(),
            self.description.clone(),
            self.frequency.clone(),
            self.multiplier.to_string(),
            self.aggregation_type.clone(),
            self.unit_type.clone(),
            self.data_type.clone(),
            self.data_unit.clone(),
            self.seasonally_adjusted.clone(),
            self.annualized.clone(),
            self.state.clone(),
            self.provider_measure_url.clone(),
            self.provider.clone(),
            self.source.clone(),
            self.source_description.clone(),
            self.country.clone(),
            self.dataset.clone(),
        ]
    }
}

/// META rows for data columns 1–32.
pub fn build_metadata() -> Vec<MetaRow> {
    (1..COLUMN_COUNT)
        .filter_map(|column| {
            let kind = ColumnKind::of(column)?;
            let code = COLUMN_CODES[column];
            Some(MetaRow {
                code: code.to_string(),
                code_mnemonic: code_mnemonic(code).to_string(),
                description: COLUMN_DESCRIPTIONS[column].to_string(),
                frequency: metadata_common::FREQUENCY.to_string(),
                multiplier: kind.multiplier(),
                aggregation_type: metadata_common::AGGREGATION_TYPE.to_string(),
                unit_type: kind.unit_type().to_string(),
                data_type: kind.data_type().to_string(),
                data_unit: kind.data_unit().to_string(),
                seasonally_adjusted: metadata_common::SEASONALLY_ADJUSTED.to_string(),
                annualized: metadata_common::ANNUALIZED.to_string(),
                state: metadata_common::STATE.to_string(),
                provider_measure_url: kind.measure_url(),
                provider: metadata_common::PROVIDER.to_string(),
                source: metadata_common::SOURCE.to_string(),
                source_description: metadata_common::SOURCE_DESCRIPTION.to_string(),
                country: metadata_common::COUNTRY.to_string(),
                dataset: metadata_common::DATASET.to_string(),
            })
        })
        .collect()
}

/// DATA sheet cells: code header row, description header row, data row.
pub fn data_sheet_rows(row: &ReportRow) -> Result<Vec<Vec<String>>, ReportError> {
    let cells = row.rendered();
    if cells.len() != COLUMN_COUNT {
        return Err(ReportError::RowWidth {
            expected: COLUMN_COUNT,
            found: cells.len(),
        });
    }
    Ok(vec![
        COLUMN_CODES.iter().map(|c| c.to_string()).collect(),
        COLUMN_DESCRIPTIONS.iter().map(|d| d.to_string()).collect(),
        cells,
    ])
}

/// META sheet cells: header row plus one row per data column.
pub fn meta_sheet_rows(rows: &[MetaRow]) -> Vec<Vec<String>> {
    std::iter::once(META_HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>())
        .chain(rows.iter().map(MetaRow::cells))
        .collect()
}

pub fn write_data_sheet(path: &Path, row: &ReportRow) -> Result<(), ReportError> {
    save_sheet(path, &data_sheet_rows(row)?)?;
    tracing::info!(path = %path.display(), "Wrote DATA file");
    Ok(())
}

pub fn write_meta_sheet(path: &Path) -> Result<(), ReportError> {
    let rows = build_metadata();
    save_sheet(path, &meta_sheet_rows(&rows))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Wrote META file");
    Ok(())
}

/// One-worksheet workbook. Numeric text becomes a number cell, empty text
/// stays blank, everything else is a string cell.
fn save_sheet(path: &Path, rows: &[Vec<String>]) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, cells) in rows.iter().enumerate() {
        let r = r as RowNum;
        for (c, cell) in cells.iter().enumerate() {
            let c = c as ColNum;
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<f64>() {
                Ok(number) if number.is_finite() => {
                    sheet.write_number(r, c, number)?;
                }
                _ => {
                    sheet.write_string(r, c, cell.as_str())?;
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}
