use chrono::{DateTime, Utc};
use std::fmt;

/// One value of a data row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// A raw CSV field. Blank fields are missing; anything else is kept verbatim
    /// until [`TimeSeries::read_numbers`] types its column.
    pub(crate) fn parse(field: &str) -> Self {
        if field.trim().is_empty() {
            return Cell::Missing;
        }
        Cell::Text(field.to_string())
    }

    fn read_number(&mut self) {
        if let Cell::Text(s) = self {
            if let Ok(v) = s.trim().parse::<f64>() {
                *self = Cell::Number(v);
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => Ok(()),
        }
    }
}

/// Rows of a data response, indexed by timestamp.
///
/// Rows keep the order the server sent them in; every row has the same width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    index: Vec<DateTime<Utc>>,
    rows: Vec<Vec<Cell>>,
    columns: Option<Vec<String>>,
}

impl TimeSeries {
    pub(crate) fn from_rows(index: Vec<DateTime<Utc>>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            index,
            rows,
            columns: None,
        }
    }

    /// Attaches column labels when they match the table width.
    ///
    /// Returns `false` and leaves the table unlabeled otherwise.
    pub(crate) fn label_columns(&mut self, names: Vec<String>) -> bool {
        if names.len() != self.width() {
            return false;
        }
        self.columns = Some(names);
        true
    }

    /// Converts text cells of every column `numeric` selects into numbers.
    ///
    /// Cells that do not parse stay text; other columns keep their raw text.
    pub(crate) fn read_numbers(&mut self, numeric: impl Fn(usize) -> bool) {
        for row in &mut self.rows {
            for (i, cell) in row.iter_mut().enumerate() {
                if numeric(i) {
                    cell.read_number();
                }
            }
        }
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of data columns, not counting the time index.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn column_names(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    pub fn column(&self, i: usize) -> Option<Vec<&Cell>> {
        if i >= self.width() {
            return None;
        }
        Some(self.rows.iter().map(|row| &row[i]).collect())
    }

    pub fn column_by_name(&self, name: &str) -> Option<Vec<&Cell>> {
        let i = self.columns.as_ref()?.iter().position(|c| c == name)?;
        self.column(i)
    }
}

impl fmt::Display for TimeSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSeries: {} row(s) x {} column(s)", self.len(), self.width())?;
        if let Some(columns) = &self.columns {
            write!(f, " [{}]", columns.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table() -> TimeSeries {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 1).unwrap();
        TimeSeries::from_rows(
            vec![t0, t1],
            vec![
                vec![Cell::parse("1.5"), Cell::parse("a")],
                vec![Cell::parse(""), Cell::parse("-3e2")],
            ],
        )
    }

    #[test]
    fn fields_stay_raw_until_typed() {
        assert_eq!(Cell::parse(" 2.5 "), Cell::Text(" 2.5 ".to_string()));
        assert_eq!(Cell::parse("OK"), Cell::Text("OK".to_string()));
        assert_eq!(Cell::parse("  "), Cell::Missing);
    }

    #[test]
    fn only_numeric_columns_become_numbers() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut ts = TimeSeries::from_rows(
            vec![t0],
            vec![[" 1e5", " 1e5", "nan", "n/a"].map(Cell::parse).to_vec()],
        );
        ts.read_numbers(|i| i != 1);
        assert_eq!(ts.rows()[0][0], Cell::Number(100000.0));
        assert_eq!(ts.rows()[0][1], Cell::Text(" 1e5".into()));
        assert!(ts.rows()[0][2].as_f64().is_some_and(f64::is_nan));
        assert_eq!(ts.rows()[0][3], Cell::Text("n/a".into()));
    }

    #[test]
    fn columns_are_addressable() {
        let mut ts = table();
        ts.read_numbers(|_| true);
        assert_eq!(ts.width(), 2);
        assert_eq!(ts.column(1).unwrap(), vec![&Cell::Text("a".into()), &Cell::Number(-300.0)]);
        assert!(ts.column(2).is_none());
        assert!(ts.column_by_name("flag").is_none());

        assert!(!ts.label_columns(vec!["only_one".into()]));
        assert!(ts.column_names().is_none());

        assert!(ts.label_columns(vec!["B".into(), "flag".into()]));
        assert_eq!(ts.column_by_name("B").unwrap()[0].as_f64(), Some(1.5));
        assert_eq!(ts.to_string(), "TimeSeries: 2 row(s) x 2 column(s) [B, flag]");
    }
}
