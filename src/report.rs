//! Side-by-side parameter tables for several fits.
//!
//! One column per named fit, one row per reported parameter. Concentration
//! parameters are converted from absorbance to mmol/L; parameters a fit does
//! not have are shown as absent rather than zero.

use crate::parameters::Parameters;
use crate::units::absorbance_to_concentration;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::{builder::Builder, settings::Style};

/// Reported parameters, in row order.
pub const ROW_KEYS: [&str; 5] = ["S0", "bias", "vmax", "Km", "a"];

/// Display labels for [`ROW_KEYS`], with units.
pub const ROW_LABELS: [&str; 5] = [
    "S0 [mmol/L]",
    "bias [mmol/L]",
    "vmax [M/min]",
    "Km [mmol/L]",
    "a [1/min]",
];

/// Rows reported as-is; every other row is an absorbance converted to mmol/L.
const UNCONVERTED: [&str; 2] = ["vmax", "a"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TableCell {
    /// Rounded to three decimals
    Value(f64),
    /// The fit has no such parameter
    Absent,
}

impl TableCell {
    pub fn value(&self) -> Option<f64> {
        match self {
            TableCell::Value(v) => Some(*v),
            TableCell::Absent => None,
        }
    }
}

impl fmt::Display for TableCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableCell::Value(v) if v.fract() == 0.0 => write!(f, "{:.1}", v),
            TableCell::Value(v) => write!(f, "{}", v),
            TableCell::Absent => write!(f, "-"),
        }
    }
}

/// `matrix[row][column]`: row per reported parameter, column per fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    pub matrix: Vec<Vec<TableCell>>,
    pub columns: Vec<String>,
    pub rows: Vec<String>,
}

impl ParameterTable {
    /// Cells of one fit, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<TableCell>> {
        let j = self.columns.iter().position(|c| c == name)?;
        Some(self.matrix.iter().map(|row| row[j]).collect())
    }
}

impl fmt::Display for ParameterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();

        let mut header = vec![String::new()];
        header.extend(self.columns.iter().cloned());
        builder.push_record(header);

        for (label, cells) in self.rows.iter().zip(&self.matrix) {
            let mut record = vec![label.clone()];
            record.extend(cells.iter().map(TableCell::to_string));
            builder.push_record(record);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        write!(f, "{}", table)
    }
}

/// Round to three decimals on the exact decimal expansion of `value`.
fn round3(value: f64) -> f64 {
    format!("{:.3}", value).parse().unwrap_or(value)
}

/// Tabulate fitted parameters from named results, in iteration order.
///
/// ```
/// use kinfit_rs::parameters::Parameters;
/// use kinfit_rs::report::{build_table, TableCell};
///
/// let mut params = Parameters::new();
/// params.add_param("S0", 1.0);
/// params.add_param("vmax", 5.0);
///
/// let table = build_table(vec![("r1/s0", &params)]);
/// assert_eq!(
///     table.column("r1/s0").unwrap(),
///     vec![
///         TableCell::Value(40.323),
///         TableCell::Absent,
///         TableCell::Value(5.0),
///         TableCell::Absent,
///         TableCell::Absent,
///     ]
/// );
/// ```
pub fn build_table<K, R, I>(results: I) -> ParameterTable
where
    K: AsRef<str>,
    R: AsRef<Parameters>,
    I: IntoIterator<Item = (K, R)>,
{
    let mut columns = Vec::new();
    let mut per_fit: Vec<Vec<TableCell>> = Vec::new();

    for (name, result) in results {
        let params = result.as_ref();
        columns.push(name.as_ref().to_string());
        per_fit.push(
            ROW_KEYS
                .iter()
                .map(|key| match params.value(key) {
                    None => TableCell::Absent,
                    Some(v) if UNCONVERTED.contains(key) => TableCell::Value(round3(v)),
                    Some(v) => TableCell::Value(round3(absorbance_to_concentration(v))),
                })
                .collect(),
        );
    }

    // transpose: one row per parameter
    let matrix = (0..ROW_KEYS.len())
        .map(|i| per_fit.iter().map(|cells| cells[i]).collect())
        .collect();

    ParameterTable {
        matrix,
        columns,
        rows: ROW_LABELS.iter().map(|s| s.to_string()).collect(),
    }
}
