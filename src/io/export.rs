//! CSV export for simulation step logs and sweep result tables.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::sim::StepResult;

const LOG_HEADER: &str = "t_seconds,dt_seconds,v_cap,v_in,i_in,eta_in,v_out,i_out,eta_out,i_leak,i_net";

/// Exports a simulation's step log to a CSV file at the given path.
pub fn export_log_csv(log: &[StepResult], dt_base: f64, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_log_csv(log, dt_base, buf)
}

/// Writes a step log as CSV to any writer. Times are converted from ticks
/// to seconds using `dt_base`.
pub fn write_log_csv(log: &[StepResult], dt_base: f64, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(LOG_HEADER.split(',').map(str::trim))?;
    for r in log {
        wtr.write_record(&[
            format!("{:.9}", r.t as f64 * dt_base),
            format!("{:.9}", r.dt as f64 * dt_base),
            format!("{:.6}", r.v_cap),
            format!("{:.6}", r.v_in),
            format!("{:.9}", r.i_in),
            format!("{:.4}", r.eta_in),
            format!("{:.6}", r.v_out),
            format!("{:.9}", r.i_out),
            format!("{:.4}", r.eta_out),
            format!("{:.9}", r.i_leak),
            format!("{:.9}", r.i_net),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Reads a step log CSV back, for round-trip tests and post-processing.
/// Only the physical columns are restored; `t`/`dt` come back in ticks
/// rounded from the stored seconds, matching what a consumer that only
/// has the CSV (not the original ticks) can reconstruct.
pub fn read_log_csv(reader: impl std::io::Read, dt_base: f64) -> io::Result<Vec<StepResult>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let get = |i: usize| record[i].parse::<f64>().unwrap_or(0.0);
        rows.push(StepResult {
            t: (get(0) / dt_base).round() as i64,
            dt: (get(1) / dt_base).round() as i64,
            v_cap: get(2),
            v_in: get(3),
            i_in: get(4),
            eta_in: get(5),
            v_out: get(6),
            i_out: get(7),
            eta_out: get(8),
            i_leak: get(9),
            i_net: get(10),
        });
    }
    Ok(rows)
}

fn csv_text(header: &[&str], rows: &[Vec<String>]) -> io::Result<String> {
    let mut buf = Vec::new();
    {
        let mut wtr = csv::WriterBuilder::new().from_writer(&mut buf);
        wtr.write_record(header)?;
        for r in rows {
            wtr.write_record(r)?;
        }
        wtr.flush()?;
    }
    Ok(String::from_utf8(buf).expect("csv writer only ever emits utf8"))
}

/// Exports a simulation's step log as four per-component frames (`cap`,
/// `load`, `harvester`, `converter`), preceded by a frame holding the sweep
/// parameters that produced this run. Each frame is an ordinary CSV table
/// introduced by a `#frame:<name>` marker line.
pub fn export_component_log_csv(
    log: &[StepResult],
    sweep_params: &[(String, f64)],
    dt_base: f64,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_component_log_csv(log, sweep_params, dt_base, buf)
}

/// Writes the four-frame per-component dump to any writer. See
/// [`export_component_log_csv`] for the frame layout.
pub fn write_component_log_csv(
    log: &[StepResult],
    sweep_params: &[(String, f64)],
    dt_base: f64,
    mut writer: impl Write,
) -> io::Result<()> {
    let params_rows: Vec<Vec<String>> = sweep_params.iter().map(|(n, v)| vec![n.clone(), v.to_string()]).collect();
    let params_text = csv_text(&["name", "value"], &params_rows)?;

    let cap_rows: Vec<Vec<String>> = log
        .iter()
        .map(|r| vec![
            format!("{:.9}", r.t as f64 * dt_base),
            format!("{:.9}", r.dt as f64 * dt_base),
            format!("{:.6}", r.v_cap),
        ])
        .collect();
    let cap_text = csv_text(&["t_seconds", "dt_seconds", "v_cap"], &cap_rows)?;

    let load_rows: Vec<Vec<String>> = log
        .iter()
        .map(|r| vec![format!("{:.9}", r.t as f64 * dt_base), format!("{:.9}", r.i_out)])
        .collect();
    let load_text = csv_text(&["t_seconds", "i_out"], &load_rows)?;

    let harvester_rows: Vec<Vec<String>> = log
        .iter()
        .map(|r| vec![
            format!("{:.9}", r.t as f64 * dt_base),
            format!("{:.6}", r.v_in),
            format!("{:.9}", r.i_in),
            format!("{:.4}", r.eta_in),
        ])
        .collect();
    let harvester_text = csv_text(&["t_seconds", "v_in", "i_in", "eta_in"], &harvester_rows)?;

    let converter_rows: Vec<Vec<String>> = log
        .iter()
        .map(|r| vec![
            format!("{:.9}", r.t as f64 * dt_base),
            format!("{:.6}", r.v_out),
            format!("{:.4}", r.eta_out),
            format!("{:.9}", r.i_leak),
            format!("{:.9}", r.i_net),
        ])
        .collect();
    let converter_text = csv_text(&["t_seconds", "v_out", "eta_out", "i_leak", "i_net"], &converter_rows)?;

    write!(
        writer,
        "#frame:params\n{params_text}\n#frame:cap\n{cap_text}\n#frame:load\n{load_text}\n#frame:harvester\n{harvester_text}\n#frame:converter\n{converter_text}"
    )
}

/// Reads a four-frame per-component dump back into the sweep parameters and
/// the reconstructed step log, for round-trip tests and post-processing.
/// The four data frames are assumed to share one row per logged tick, in
/// the same order they were written.
pub fn read_component_log_csv(mut reader: impl Read, dt_base: f64) -> io::Result<(Vec<(String, f64)>, Vec<StepResult>)> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let mut frames: HashMap<String, String> = HashMap::new();
    for chunk in content.split("#frame:") {
        if chunk.trim().is_empty() {
            continue;
        }
        let mut parts = chunk.splitn(2, '\n');
        let name = parts.next().unwrap_or("").trim().to_string();
        let body = parts.next().unwrap_or("").to_string();
        frames.insert(name, body);
    }

    let mut params = Vec::new();
    if let Some(body) = frames.get("params") {
        let mut rdr = csv::Reader::from_reader(body.as_bytes());
        for record in rdr.records() {
            let record = record?;
            params.push((record[0].to_string(), record[1].parse::<f64>().unwrap_or(0.0)));
        }
    }

    fn rows_of(body: Option<&String>) -> io::Result<Vec<csv::StringRecord>> {
        let mut rows = Vec::new();
        if let Some(body) = body {
            let mut rdr = csv::Reader::from_reader(body.as_bytes());
            for record in rdr.records() {
                rows.push(record?);
            }
        }
        Ok(rows)
    }

    let cap_rows = rows_of(frames.get("cap"))?;
    let load_rows = rows_of(frames.get("load"))?;
    let harvester_rows = rows_of(frames.get("harvester"))?;
    let converter_rows = rows_of(frames.get("converter"))?;

    let mut log = Vec::with_capacity(cap_rows.len());
    for i in 0..cap_rows.len() {
        let cap = &cap_rows[i];
        let load = &load_rows[i];
        let harvester = &harvester_rows[i];
        let converter = &converter_rows[i];
        let get = |r: &csv::StringRecord, i: usize| r[i].parse::<f64>().unwrap_or(0.0);
        log.push(StepResult {
            t: (get(cap, 0) / dt_base).round() as i64,
            dt: (get(cap, 1) / dt_base).round() as i64,
            v_cap: get(cap, 2),
            v_in: get(harvester, 1),
            i_in: get(harvester, 2),
            eta_in: get(harvester, 3),
            v_out: get(converter, 1),
            i_out: get(load, 1),
            eta_out: get(converter, 2),
            i_leak: get(converter, 3),
            i_net: get(converter, 4),
        });
    }
    Ok((params, log))
}

/// One row of a sweep's result table: the axis values that produced it,
/// plus the requested metrics.
#[derive(Debug, Clone)]
pub struct SweepResultRow {
    pub params: Vec<(String, f64)>,
    pub metrics: Vec<(String, f64)>,
}

/// Writes sweep results as CSV: one column per axis, then one per metric.
/// All rows must share the same axis/metric names in the same order.
pub fn write_sweep_csv(rows: &[SweepResultRow], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    if let Some(first) = rows.first() {
        let header: Vec<&str> = first
            .params
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(first.metrics.iter().map(|(n, _)| n.as_str()))
            .collect();
        wtr.write_record(&header)?;
    }
    for row in rows {
        let values: Vec<String> = row
            .params
            .iter()
            .map(|(_, v)| v.to_string())
            .chain(row.metrics.iter().map(|(_, v)| v.to_string()))
            .collect();
        wtr.write_record(&values)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(t: i64) -> StepResult {
        StepResult {
            t,
            dt: 100,
            v_cap: 2.5,
            v_in: 0.5,
            i_in: 1e-4,
            eta_in: 0.9,
            v_out: 1.8,
            i_out: 5e-5,
            eta_out: 0.95,
            i_leak: 1e-7,
            i_net: 4e-5,
        }
    }

    #[test]
    fn header_matches_schema() {
        let log = vec![make_row(0)];
        let mut buf = Vec::new();
        write_log_csv(&log, 1e-6, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().next().unwrap(), LOG_HEADER);
    }

    #[test]
    fn row_count_matches_log_length() {
        let log: Vec<StepResult> = (0..10).map(make_row).collect();
        let mut buf = Vec::new();
        write_log_csv(&log, 1e-6, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().count(), 11);
    }

    #[test]
    fn deterministic_output() {
        let log: Vec<StepResult> = (0..5).map(make_row).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_log_csv(&log, 1e-6, &mut buf1).unwrap();
        write_log_csv(&log, 1e-6, &mut buf2).unwrap();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn round_trips_through_csv() {
        let log: Vec<StepResult> = (0..3).map(|i| make_row(i * 1000)).collect();
        let mut buf = Vec::new();
        write_log_csv(&log, 1e-6, &mut buf).unwrap();
        let restored = read_log_csv(buf.as_slice(), 1e-6).unwrap();
        assert_eq!(restored.len(), log.len());
        for (a, b) in log.iter().zip(restored.iter()) {
            assert_eq!(a.t, b.t);
            assert!((a.v_cap - b.v_cap).abs() < 1e-6);
        }
    }

    #[test]
    fn sweep_csv_has_one_column_per_param_and_metric() {
        let rows = vec![SweepResultRow {
            params: vec![("capacitance".into(), 1e-4)],
            metrics: vec![("forward_progress".into(), 0.8)],
        }];
        let mut buf = Vec::new();
        write_sweep_csv(&rows, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert_eq!(out.lines().next().unwrap(), "capacitance,forward_progress");
    }

    #[test]
    fn component_dump_has_one_frame_per_component_plus_params() {
        let log: Vec<StepResult> = (0..3).map(make_row).collect();
        let params = vec![("capacitance".to_string(), 1e-4)];
        let mut buf = Vec::new();
        write_component_log_csv(&log, &params, 1e-6, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();
        for frame in ["#frame:params", "#frame:cap", "#frame:load", "#frame:harvester", "#frame:converter"] {
            assert!(out.contains(frame), "missing {frame}");
        }
    }

    #[test]
    fn component_dump_round_trips_params_and_log() {
        let log: Vec<StepResult> = (0..5).map(|i| make_row(i * 1000)).collect();
        let params = vec![("v_initial".to_string(), 3.0), ("v_checkpoint".to_string(), 3.4)];
        let mut buf = Vec::new();
        write_component_log_csv(&log, &params, 1e-6, &mut buf).unwrap();
        let (restored_params, restored_log) = read_component_log_csv(buf.as_slice(), 1e-6).unwrap();

        assert_eq!(restored_params, params);
        assert_eq!(restored_log.len(), log.len());
        for (a, b) in log.iter().zip(restored_log.iter()) {
            assert_eq!(a.t, b.t);
            assert_eq!(a.dt, b.dt);
            assert!((a.v_cap - b.v_cap).abs() < 1e-6);
            assert!((a.v_in - b.v_in).abs() < 1e-6);
            assert!((a.i_out - b.i_out).abs() < 1e-9);
            assert!((a.i_net - b.i_net).abs() < 1e-9);
        }
    }
}
