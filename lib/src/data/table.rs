use std::io;

/// Cell contents treated as missing when reading a csv.
pub const NA_VALUES: &[&str] = &[
  "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
  "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Header prefix given to columns without a name.
pub const UNNAMED_PREFIX: &str = "Unnamed";

/// Untyped csv contents: header names plus rows of optional cells.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
  pub headers: Vec<String>,
  pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
  pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().from_reader(reader);
    let headers = reader
      .headers()?
      .iter()
      .enumerate()
      .map(|(i, name)| {
        if name.trim().is_empty() {
          format!("{UNNAMED_PREFIX}: {i}")
        } else {
          name.to_string()
        }
      })
      .collect();
    let rows = reader
      .records()
      .map(|record| record.map(|record| record.iter().map(parse_cell).collect()))
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { headers, rows })
  }

  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.headers.iter().position(|h| h == name)
  }

  pub fn column(&self, idx: usize) -> impl Iterator<Item = Option<&str>> + '_ {
    self.rows.iter().map(move |row| row[idx].as_deref())
  }

  /// Whether every present value of the column reads as a number.
  pub fn is_numeric(&self, idx: usize) -> bool {
    self
      .column(idx)
      .flatten()
      .all(|value| value.trim().parse::<f64>().is_ok())
  }

  pub fn remove_column(&mut self, idx: usize) {
    self.headers.remove(idx);
    for row in self.rows.iter_mut() {
      row.remove(idx);
    }
  }

  /// Keeps only the columns for which `keep` returns true.
  pub fn retain_columns(&mut self, mut keep: impl FnMut(&Self, usize) -> bool) {
    let dropped: Vec<usize> = (0..self.headers.len()).filter(|&i| !keep(self, i)).collect();
    for idx in dropped.into_iter().rev() {
      self.remove_column(idx);
    }
  }
}

pub fn parse_cell(raw: &str) -> Option<String> {
  if NA_VALUES.contains(&raw) {
    None
  } else {
    Some(raw.to_string())
  }
}
