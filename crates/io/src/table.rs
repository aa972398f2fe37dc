//! Header + rows of text cells, read from CSV or a workbook's first sheet.

use std::path::Path;

use crate::error::IoError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// File name used in error messages.
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(source: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        // Drop rows where every cell is blank.
        let rows = rows
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .collect();
        Self {
            source: source.into(),
            headers,
            rows,
        }
    }

    /// Read `.csv` as text, anything calamine opens as a workbook.
    pub fn read(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => crate::csv::read_table(path),
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => crate::xlsx::read_table(path),
            _ => Err(IoError::UnsupportedExtension {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn column(&self, name: &str) -> Result<usize, IoError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| IoError::MissingColumn {
                file: self.source.clone(),
                column: name.to_string(),
            })
    }

    /// Resolve several columns at once, in order.
    pub fn columns<const N: usize>(&self, names: [&str; N]) -> Result<[usize; N], IoError> {
        let mut out = [0; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.column(name)?;
        }
        Ok(out)
    }

    /// Data rows with their 1-based line number in the source (header = 1).
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, cells)| Record { line: i + 2, cells })
    }
}

/// One data row. Missing trailing cells read as empty.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub line: usize,
    cells: &'a [String],
}

impl<'a> Record<'a> {
    pub fn get(&self, col: usize) -> &'a str {
        self.cells.get(col).map(|c| c.trim()).unwrap_or("")
    }
}

/// Render a numeric cell without a trailing `.0` for integers.
pub fn number_text(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Parse an integer cell that may have been stored as a float (`7.0`).
pub fn parse_int<T: std::str::FromStr>(cell: &str) -> Option<T> {
    let cell = cell.trim();
    cell.parse()
        .ok()
        .or_else(|| cell.strip_suffix(".0").and_then(|c| c.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            "t.csv",
            vec![" Side ".into(), "BP".into()],
            vec![
                vec!["C".into(), "alpha".into()],
                vec![" ".into(), "".into()],
                vec!["A".into()],
            ],
        )
    }

    #[test]
    fn headers_trimmed_and_blank_rows_dropped() {
        let t = table();
        assert_eq!(t.headers, vec!["Side", "BP"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.column("Side").unwrap(), 0);
    }

    #[test]
    fn missing_column_names_file() {
        let err = table().column("M/S/A").unwrap_err();
        assert_eq!(err.to_string(), "t.csv: missing column 'M/S/A'");
        assert!(err.is_parse());
    }

    #[test]
    fn short_rows_read_empty() {
        let t = table();
        let last = t.records().last().unwrap();
        assert_eq!(last.line, 3);
        assert_eq!(last.get(0), "A");
        assert_eq!(last.get(1), "");
    }

    #[test]
    fn numbers_and_ints() {
        assert_eq!(number_text(7.0), "7");
        assert_eq!(number_text(8.25), "8.25");
        assert_eq!(parse_int::<u8>("7.0"), Some(7));
        assert_eq!(parse_int::<u32>(" 14 "), Some(14));
        assert_eq!(parse_int::<u8>("x"), None);
    }

    #[test]
    fn unknown_extension_rejected() {
        let err = Table::read(Path::new("mapping.txt")).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedExtension { .. }));
    }
}
