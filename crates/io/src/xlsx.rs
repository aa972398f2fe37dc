// Excel / ODS import (first worksheet only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::error::IoError;
use crate::table::{number_text, Table};

pub fn read_table(path: &Path) -> Result<Table, IoError> {
    let workbook_err = |message: String| IoError::Workbook {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| workbook_err(format!("failed to open workbook: {e}")))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| workbook_err("workbook contains no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| workbook_err(format!("failed to read sheet '{sheet}': {e}")))?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();
    log::debug!("{}: sheet '{sheet}', {} rows", path.display(), rows.len());

    Ok(Table::new(crate::csv::file_name(path), headers, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Format nicely: integers without decimals
        Data::Float(n) => number_text(*n),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{e:?}"),
        Data::DateTime(dt) => number_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_render_as_text() {
        assert_eq!(cell_text(&Data::Float(7.0)), "7");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(3)), "3");
        assert_eq!(cell_text(&Data::String("P5".into())), "P5");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn unreadable_workbook_is_a_workbook_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip").unwrap();
        let err = read_table(&path).unwrap_err();
        assert!(matches!(err, IoError::Workbook { .. }));
    }
}
