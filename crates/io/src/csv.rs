// CSV import and report export

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use lvmap_recon::report::{ReportRow, ReportTable};

use crate::error::IoError;
use crate::table::Table;

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |source| IoError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            log::debug!("{}: not UTF-8, decoded as Windows-1252", path.display());
            Ok(decoded.into_owned())
        }
    }
}

pub fn read_table(path: &Path) -> Result<Table, IoError> {
    let content = read_file_as_utf8(path)?;
    table_from_str(&file_name(path), &content)
}

/// Parse CSV text whose first record is the header.
pub fn table_from_str(source: &str, content: &str) -> Result<Table, IoError> {
    let csv_err = |source_err| IoError::Csv {
        file: source.to_string(),
        source: source_err,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table::new(source, headers, rows))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write one report. Separator rows become a single-space cell per column.
pub fn write_report(table: &ReportTable, path: &Path) -> Result<(), IoError> {
    let write_err = |e: csv::Error| IoError::Write {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(write_err)?;

    writer.write_record(&table.header).map_err(write_err)?;
    let blank = vec![" "; table.width()];
    for row in &table.rows {
        match row {
            ReportRow::Data(cells) => writer.write_record(cells),
            ReportRow::Separator => writer.write_record(&blank),
        }
        .map_err(write_err)?;
    }
    writer.flush().map_err(|source| IoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write every report as `<dir>/<name>.csv`, creating `dir` if needed.
pub fn write_reports(tables: &[ReportTable], dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    fs::create_dir_all(dir).map_err(|source| IoError::Write {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let path = dir.join(format!("{}.csv", table.name));
        write_report(table, &path)?;
        written.push(path);
    }
    log::info!("wrote {} reports to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_and_ragged_records() {
        let t = table_from_str("in.csv", "Positronic,Swap to\n5,9\n6\n").unwrap();
        assert_eq!(t.headers, vec!["Positronic", "Swap to"]);
        assert_eq!(t.rows, vec![vec!["5", "9"], vec!["6"]]);
    }

    #[test]
    fn windows_1252_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Température" in Windows-1252
        fs::write(&path, b"Temp\xe9rature\n1\n").unwrap();
        let t = read_table(&path).unwrap();
        assert_eq!(t.headers, vec!["Température"]);
        assert_eq!(t.source, "latin.csv");
    }

    #[test]
    fn separators_written_as_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = ReportTable::new("fixes", &["Pos", "Pins"]);
        table.rows = vec![
            ReportRow::Separator,
            ReportRow::Data(vec!["P1".into(), "1,9".into()]),
        ];
        let written = write_reports(&[table], &dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 1);
        let text = fs::read_to_string(&written[0]).unwrap();
        assert_eq!(text, "Pos,Pins\n , \nP1,\"1,9\"\n");
    }
}
