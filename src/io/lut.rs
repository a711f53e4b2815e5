//! Fixed-file LUT loader for the BQ25570 converter. Four files are read
//! once at construction; the converter caches its own lookups afterward.

use std::path::Path;

use crate::components::converter::{BoostRow, BuckRow, QuiescentRow};
use crate::error::SimError;

fn missing(path: &Path) -> SimError {
    SimError::DataFileMissing { path: path.display().to_string() }
}

fn read_csv<const N: usize>(path: &Path) -> Result<Vec<[f64; N]>, SimError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|_| missing(path))?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| SimError::DataFileMissing {
            path: format!("{}: {e}", path.display()),
        })?;
        let mut row = [0.0; N];
        for (i, slot) in row.iter_mut().enumerate() {
            *slot = record
                .get(i)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| SimError::DataFileMissing {
                    path: format!("{}: malformed row {:?}", path.display(), record),
                })?;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Loads the four fixed BQ25570 LUT files from `dir`: `boostConverterData`,
/// `buckConverterData_vout=<v_out>` (must match one of the six supported
/// output voltages), `quiescentData_activeMode`, `quiescentData_standbyMode`.
pub fn load_bq25570_luts(
    dir: &Path,
    v_out: f64,
) -> Result<(Vec<BoostRow>, Vec<BuckRow>, Vec<QuiescentRow>, Vec<QuiescentRow>), SimError> {
    let boost_path = dir.join("boostConverterData");
    let buck_path = dir.join(format!("buckConverterData_vout={v_out}"));
    let active_path = dir.join("quiescentData_activeMode");
    let standby_path = dir.join("quiescentData_standbyMode");

    let boost: Vec<BoostRow> = read_csv::<4>(&boost_path)?
        .into_iter()
        .map(|r| (r[0], r[1], r[2], r[3]))
        .collect();
    let buck: Vec<BuckRow> = read_csv::<3>(&buck_path)?.into_iter().map(|r| (r[0], r[1], r[2])).collect();
    let active: Vec<QuiescentRow> = read_csv::<2>(&active_path)?.into_iter().map(|r| (r[0], r[1])).collect();
    let standby: Vec<QuiescentRow> = read_csv::<2>(&standby_path)?.into_iter().map(|r| (r[0], r[1])).collect();

    Ok((boost, buck, active, standby))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        writeln!(f, "{header}").unwrap();
        for r in rows {
            writeln!(f, "{r}").unwrap();
        }
    }

    #[test]
    fn loads_all_four_files() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("harvest-sim-lut-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        write_csv(&dir, "boostConverterData", "v_in,v_stor,i_in_ua,eta_pct", &["0.3,2.0,50.0,60.0"]);
        write_csv(&dir, "buckConverterData_vout=1.8", "v_stor,i_out,eta", &["2.0,0.0001,0.9"]);
        write_csv(&dir, "quiescentData_activeMode", "v_stor,i_quiescent", &["2.0,0.000001"]);
        write_csv(&dir, "quiescentData_standbyMode", "v_stor,i_quiescent", &["2.0,0.0000005"]);

        let (boost, buck, active, standby) = load_bq25570_luts(&dir, 1.8).unwrap();
        assert_eq!(boost.len(), 1);
        assert_eq!(buck.len(), 1);
        assert_eq!(active.len(), 1);
        assert_eq!(standby.len(), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_reports_data_file_missing() {
        let err = load_bq25570_luts(Path::new("/nonexistent/lut/dir"), 1.8).unwrap_err();
        assert!(matches!(err, SimError::DataFileMissing { .. }));
    }
}
