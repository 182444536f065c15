// src/table.rs
//
// mumax3 `table.txt`: one `#`-prefixed header row of tab-separated `name (unit)`
// columns, then one row of numbers per `tablesave()`.

use std::path::{Path, PathBuf};

use crate::error::{Result, ScripterError};

/// Columns every analysis step relies on.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "t", "mx", "my", "mz", "E_total", "E_exch", "E_demag", "E_Zeeman", "B_extx", "B_exty",
    "B_extz",
];

/// Header mumax3 writes for the columns the script builder registers.
pub const TABLE_HEADER: &str = "# t (s)\tmx ()\tmy ()\tmz ()\tE_total (J)\tE_exch (J)\tE_demag (J)\tE_Zeeman (J)\tMaxTorque (T)\tLastErr ()\tPeakErr ()\tB_extx (T)\tB_exty (T)\tB_extz (T)";

#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    /// Full header entries, e.g. `E_exch (J)`.
    pub headers: Vec<String>,
    /// Header names with the unit stripped, e.g. `E_exch`.
    pub names: Vec<String>,
    /// Row-major samples.
    pub rows: Vec<Vec<f64>>,
}

fn strip_unit(header: &str) -> &str {
    match header.find(" (") {
        Some(p) => &header[..p],
        None => header.trim(),
    }
}

impl Table {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let err = |line: usize, reason: String| ScripterError::Table {
            path: path.to_path_buf(),
            line,
            reason,
        };

        let mut lines = raw.lines().enumerate();
        let (headers, names) = loop {
            let Some((_, line)) = lines.next() else {
                return Err(err(0, "missing header row".into()));
            };
            if line.trim().is_empty() {
                continue;
            }
            let Some(rest) = line.strip_prefix('#') else {
                return Err(err(1, "header row must start with '#'".into()));
            };
            let headers: Vec<String> = rest
                .trim_start()
                .split('\t')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect();
            let names = headers.iter().map(|h| strip_unit(h).to_string()).collect();
            break (headers, names);
        };

        let n_cols = headers.len();
        let mut rows = Vec::new();
        for (i, line) in lines {
            let t = line.trim();
            if t.is_empty() || t.starts_with('#') {
                continue;
            }
            let row = t
                .split('\t')
                .map(|c| {
                    c.trim()
                        .parse::<f64>()
                        .map_err(|_| err(i + 1, format!("non-numeric cell '{}'", c.trim())))
                })
                .collect::<Result<Vec<f64>>>()?;
            if row.len() != n_cols {
                return Err(err(
                    i + 1,
                    format!("expected {} columns, found {}", n_cols, row.len()),
                ));
            }
            rows.push(row);
        }

        let table = Self {
            path: path.to_path_buf(),
            headers,
            names,
            rows,
        };
        for name in REQUIRED_COLUMNS {
            if table.index_of(name).is_none() {
                return Err(err(1, format!("missing column '{}'", name)));
            }
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column position by bare name (`mx`) or full header (`mx ()`).
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .or_else(|| self.headers.iter().position(|h| h == name))
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let c = self.index_of(name)?;
        Some(self.rows.iter().map(|r| r[c]).collect())
    }

    fn required(&self, name: &str) -> Vec<f64> {
        // present by construction
        self.column(name).unwrap_or_default()
    }

    /// Time in seconds.
    pub fn time(&self) -> Vec<f64> {
        self.required("t")
    }

    /// Reduced magnetization per row.
    pub fn magnetization(&self) -> Vec<[f64; 3]> {
        zip3(self.required("mx"), self.required("my"), self.required("mz"))
    }

    /// Applied field per row in tesla.
    pub fn field(&self) -> Vec<[f64; 3]> {
        zip3(
            self.required("B_extx"),
            self.required("B_exty"),
            self.required("B_extz"),
        )
    }

    /// |E_exch| + |E_demag| + |E_Zeeman| per row (J).
    ///
    /// mumax3 reports the Zeeman energy with a sign, so `E_total` can dip below the
    /// other terms; the absolute sum is what the plots show.
    pub fn absolute_energy(&self) -> Vec<f64> {
        let ex = self.required("E_exch");
        let de = self.required("E_demag");
        let ze = self.required("E_Zeeman");
        ex.iter()
            .zip(&de)
            .zip(&ze)
            .map(|((a, b), c)| a.abs() + b.abs() + c.abs())
            .collect()
    }
}

fn zip3(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Vec<[f64; 3]> {
    x.into_iter()
        .zip(y)
        .zip(z)
        .map(|((x, y), z)| [x, y, z])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let raw = format!(
            "{}\n0\t1\t0\t0\t1e-16\t2e-17\t3e-17\t-4e-17\t0\t0\t0\t0\t0\t0\n\
             1e-9\t0.5\t0.5\t0\t1e-16\t2e-17\t3e-17\t-4e-17\t0\t0\t0\t0.01\t0\t0\n",
            TABLE_HEADER
        );
        let t = Table::parse(Path::new("table.txt"), &raw).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.index_of("E_exch"), Some(5));
        assert_eq!(t.index_of("E_exch (J)"), Some(5));
        assert_eq!(t.time(), vec![0.0, 1e-9]);
        assert_eq!(t.field()[1], [0.01, 0.0, 0.0]);
        assert_eq!(t.magnetization()[1], [0.5, 0.5, 0.0]);
        assert!((t.absolute_energy()[0] - 9e-17).abs() < 1e-30);
    }

    #[test]
    fn bad_rows_report_their_line() {
        let raw = format!("{}\n0\t1\t0\n", TABLE_HEADER);
        match Table::parse(Path::new("table.txt"), &raw) {
            Err(ScripterError::Table { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected table error, got {:?}", other),
        }

        let raw = format!("{}\n\n0\t1\t0\t0\t1\t2\t3\t4\t0\t0\t0\tnan?\t0\t0\n", TABLE_HEADER);
        match Table::parse(Path::new("table.txt"), &raw) {
            Err(ScripterError::Table { line, reason, .. }) => {
                assert_eq!(line, 3);
                assert!(reason.contains("nan?"));
            }
            other => panic!("expected table error, got {:?}", other),
        }
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let raw = "# t (s)\tmx ()\n0\t1\n";
        assert!(matches!(
            Table::parse(Path::new("table.txt"), raw),
            Err(ScripterError::Table { .. })
        ));
    }
}
