//! On-disk trace loaders for the harvester variants that need real data:
//! irradiance time-series, I-V curves, and TEG MPP-current traces.
//!
//! File I/O is only ever called at construction (`reset`-time in the
//! original source); the core loop never touches disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::components::{IvCurve, SteppedTrace};
use crate::error::SimError;

/// The single-line JSON header that precedes every irradiance trace file.
#[derive(Debug, Deserialize)]
struct IrradianceHeader {
    #[serde(rename = "Type")]
    #[allow(dead_code)]
    kind: String,
    #[serde(rename = "StartTime")]
    #[allow(dead_code)]
    start_time: String,
    #[serde(rename = "Season")]
    #[allow(dead_code)]
    season: String,
    #[serde(rename = "TraceLength")]
    trace_length: f64,
}

#[derive(Debug, Deserialize)]
struct IrradianceSample {
    irradiance: f64,
}

fn missing(path: &Path) -> SimError {
    SimError::DataFileMissing { path: path.display().to_string() }
}

/// Loads a `SolarPanel` irradiance trace. `index` (seconds-from-start) is
/// scaled by `1/dt_base` into ticks.
pub fn load_irradiance_trace(path: &Path, dt_base: f64) -> Result<SteppedTrace, SimError> {
    let content = fs::read_to_string(path).map_err(|_| missing(path))?;
    let mut lines = content.splitn(2, '\n');
    let header_line = lines.next().unwrap_or_default();
    let header: IrradianceHeader = serde_json::from_str(header_line).map_err(|e| SimError::TraceOutOfRange {
        component: "harvester".into(),
        message: format!("invalid irradiance header: {e}"),
    })?;
    let body = lines.next().unwrap_or_default();
    let table: BTreeMap<String, IrradianceSample> = serde_json::from_str(body).map_err(|e| SimError::TraceOutOfRange {
        component: "harvester".into(),
        message: format!("invalid irradiance table: {e}"),
    })?;

    let mut entries: Vec<(f64, f64)> = table
        .into_iter()
        .filter_map(|(idx, sample)| idx.parse::<f64>().ok().map(|seconds| (seconds, sample.irradiance)))
        .collect();
    entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    if entries.is_empty() {
        return Err(SimError::TraceOutOfRange {
            component: "harvester".into(),
            message: "irradiance table has no entries".into(),
        });
    }

    let times: Vec<i64> = entries.iter().map(|(s, _)| (s / dt_base).round() as i64).collect();
    let values: Vec<f64> = entries.into_iter().map(|(_, v)| v).collect();

    let _ = header.trace_length;
    Ok(SteppedTrace::new(times, values))
}

/// Loads a static `IVCurve` harvester table. Row order in the source file
/// is irrelevant; the loader sorts by voltage and takes the current's
/// absolute value.
pub fn load_iv_curve(path: &Path) -> Result<IvCurve, SimError> {
    let content = fs::read_to_string(path).map_err(|_| missing(path))?;
    let table: BTreeMap<String, f64> = serde_json::from_str(&content).map_err(|e| SimError::TraceOutOfRange {
        component: "harvester".into(),
        message: format!("invalid IV curve table: {e}"),
    })?;

    let mut entries: Vec<(f64, f64)> = table
        .into_iter()
        .filter_map(|(v, i)| v.parse::<f64>().ok().map(|voltage| (voltage, i.abs())))
        .collect();
    entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    if entries.is_empty() {
        return Err(SimError::TraceOutOfRange {
            component: "harvester".into(),
            message: "IV curve table has no entries".into(),
        });
    }

    let (voltage, current): (Vec<f64>, Vec<f64>) = entries.into_iter().unzip();
    Ok(IvCurve::new(voltage, current))
}

/// Loads a TEG MPP-current trace from a CSV with a `boost_ichg_ua` column
/// and a `time_s` seconds-from-start column.
pub fn load_teg_trace(path: &Path, dt_base: f64) -> Result<SteppedTrace, SimError> {
    let mut rdr = csv::Reader::from_path(path).map_err(|_| missing(path))?;
    let headers = rdr.headers().map_err(|e| SimError::TraceOutOfRange {
        component: "harvester".into(),
        message: format!("TEG trace header error: {e}"),
    })?.clone();
    let time_idx = headers.iter().position(|h| h == "time_s").ok_or_else(|| SimError::TraceOutOfRange {
        component: "harvester".into(),
        message: "TEG trace missing time_s column".into(),
    })?;
    let current_idx = headers.iter().position(|h| h == "boost_ichg_ua").ok_or_else(|| SimError::TraceOutOfRange {
        component: "harvester".into(),
        message: "TEG trace missing boost_ichg_ua column".into(),
    })?;

    let mut times = Vec::new();
    let mut values = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| SimError::TraceOutOfRange {
            component: "harvester".into(),
            message: format!("TEG trace row error: {e}"),
        })?;
        let seconds: f64 = record[time_idx].parse().unwrap_or(0.0);
        let i_ua: f64 = record[current_idx].parse().unwrap_or(0.0);
        times.push((seconds / dt_base).round() as i64);
        values.push(i_ua * 1e-6);
    }

    if times.is_empty() {
        return Err(SimError::TraceOutOfRange {
            component: "harvester".into(),
            message: "TEG trace has no rows".into(),
        });
    }

    Ok(SteppedTrace::new(times, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("harvest-sim-test-{name}-{}", std::process::id()));
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn irradiance_trace_scales_index_to_ticks() {
        let content = "{\"Type\":\"solar\",\"StartTime\":\"2024-01-01\",\"Season\":\"summer\",\"TraceLength\":120}\n\
             {\"0\":{\"irradiance\":800.0},\"60\":{\"irradiance\":900.0}}";
        let path = write_temp("irradiance", content);
        let trace = load_irradiance_trace(&path, 1e-3).unwrap();
        assert_eq!(trace.time_max(), 60_000);
        fs::remove_file(path).ok();
    }

    #[test]
    fn iv_curve_sorts_by_voltage_and_takes_abs() {
        let content = r#"{"1.0": -0.5, "0.0": 0.6}"#;
        let path = write_temp("iv", content);
        let curve = load_iv_curve(&path).unwrap();
        let mut curve = curve;
        assert_eq!(curve.current(0, 0.0), 0.6);
        assert_eq!(curve.current(0, 1.0), 0.5);
        fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_reports_data_file_missing() {
        let err = load_irradiance_trace(Path::new("/nonexistent/trace.json"), 1e-6).unwrap_err();
        assert!(matches!(err, SimError::DataFileMissing { .. }));
    }
}
