// 📥 CSV bulk import of players
//
// First non-blank line is the header; every following non-blank line is
// one candidate player. A failing row is recorded and skipped, never
// aborting the batch. Rows already imported stay imported.

use crate::error::{RosterError, RosterResult};
use crate::store::{CellValue, Row};
use crate::table::RecordTable;
use serde::Serialize;
use tracing::{info, warn};

/// Columns the header must contain.
pub const REQUIRED_COLUMNS: [&str; 2] = ["name", "registration_number"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// "row N: message", N counted over non-blank lines with the header as row 1
    pub errors: Vec<String>,
}

/// Split one delimited line into fields.
///
/// Double-quoted fields may contain commas; `""` inside quotes is a
/// literal quote.
pub fn parse_csv_line(line: &str) -> RosterResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => {
            let record =
                record.map_err(|e| RosterError::Validation(format!("malformed CSV line: {}", e)))?;
            Ok(record.iter().map(str::to_string).collect())
        }
        None => Ok(Vec::new()),
    }
}

/// Import players from CSV text through the players table.
///
/// Fails as a whole only when the header is unusable or there are no data
/// rows; both are checked before anything is written.
pub fn import_players(players: &RecordTable, text: &str) -> RosterResult<ImportSummary> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let Some((header_line, data_lines)) = lines.split_first() else {
        return Err(RosterError::Validation("CSV has no data rows".to_string()));
    };

    let header: Vec<String> = parse_csv_line(header_line)?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    for column in REQUIRED_COLUMNS {
        if !header.iter().any(|h| h == column) {
            return Err(RosterError::Validation(format!(
                "CSV header must include {}",
                column
            )));
        }
    }

    if data_lines.is_empty() {
        return Err(RosterError::Validation("CSV has no data rows".to_string()));
    }

    let mut summary = ImportSummary::default();

    for (offset, line) in data_lines.iter().enumerate() {
        // header is row 1
        let row_number = offset + 2;

        let outcome = parse_csv_line(line).and_then(|values| {
            let fields: Row = header
                .iter()
                .zip(values)
                .map(|(column, value)| (column.clone(), CellValue::Text(value.trim().to_string())))
                .collect();
            players.add(fields)
        });

        match outcome {
            Ok(_) => summary.imported += 1,
            Err(e) => {
                warn!(row = row_number, error = %e, "import row skipped");
                summary.skipped += 1;
                summary.errors.push(format!("row {}: {}", row_number, e));
            }
        }
    }

    info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "player import finished"
    );
    Ok(summary)
}
