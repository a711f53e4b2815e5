//! Simulator entry point — CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use harvest_sim::config::ScenarioConfig;
use harvest_sim::io::export;
use harvest_sim::sweep::{MetricSpec, SweepAxis, SweepSettings, run_sweep};

fn print_help() {
    eprintln!("harvest-sim — intermittent-power embedded device simulator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  harvest-sim simulate [OPTIONS]");
    eprintln!("  harvest-sim sweep [OPTIONS]");
    eprintln!();
    eprintln!("simulate options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset");
    eprintln!("  --until <seconds>        Override simulation.until_seconds");
    eprintln!("  --telemetry-out <path>   Export the step log to CSV");
    eprintln!();
    eprintln!("sweep options:");
    eprintln!("  --scenario <path>        Base scenario TOML file");
    eprintln!("  --preset <name>          Base scenario preset");
    eprintln!("  --axis <name>=<v1,v2,…>  Sweep axis, repeatable (see below)");
    eprintln!("  --metric <name>          Metric to report, repeatable (see below)");
    eprintln!("  --out <path>             Write the result table to CSV (default: stdout)");
    eprintln!();
    eprintln!("recognized axis names: capacitor.capacitance, capacitor.v_initial,");
    eprintln!("  converter.v_ov, load.current");
    eprintln!("recognized metric names: v_cap_final, v_cap_min, v_cap_max, step_count");
    eprintln!();
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If neither --scenario nor --preset is given, the diode_task_load preset is used.");
}

fn load_scenario(scenario_path: &Option<String>, preset: &Option<String>) -> ScenarioConfig {
    let cfg = if let Some(path) = scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(name) = preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::diode_task_load())
    };
    match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn require_arg(args: &[String], i: &mut usize, flag: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires an argument");
        process::exit(1);
    }
    args[*i].clone()
}

fn run_simulate(args: &[String]) {
    let mut scenario_path = None;
    let mut preset = None;
    let mut until_override = None;
    let mut telemetry_out = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => scenario_path = Some(require_arg(args, &mut i, "--scenario")),
            "--preset" => preset = Some(require_arg(args, &mut i, "--preset")),
            "--until" => {
                let raw = require_arg(args, &mut i, "--until");
                until_override = Some(raw.parse::<f64>().unwrap_or_else(|_| {
                    eprintln!("error: --until value \"{raw}\" is not a valid number of seconds");
                    process::exit(1);
                }));
            }
            "--telemetry-out" => telemetry_out = Some(require_arg(args, &mut i, "--telemetry-out")),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    let mut scenario = load_scenario(&scenario_path, &preset);
    if let Some(seconds) = until_override {
        scenario.simulation.until_seconds = seconds;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let capacitor = scenario.build_capacitor();
    let harvester = scenario.build_harvester().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let converter = scenario.build_converter().unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let load = scenario.build_load();

    let mut sim = harvest_sim::sim::Simulation::new(scenario.simulation.engine_config(), harvester, capacitor, converter, load);
    let until = scenario.simulation.ticks(scenario.simulation.until_seconds);
    if let Err(e) = sim.run(until) {
        eprintln!("{e}");
        process::exit(1);
    }

    for r in sim.log() {
        println!(
            "t={:.6}s v_cap={:.4}V v_in={:.4}V i_in={:.3e}A v_out={:.4}V i_out={:.3e}A i_net={:.3e}A",
            r.t as f64 * scenario.simulation.dt_base,
            r.v_cap,
            r.v_in,
            r.i_in,
            r.v_out,
            r.i_out,
            r.i_net
        );
    }

    if let Some(path) = telemetry_out {
        if let Err(e) = export::export_log_csv(sim.log(), scenario.simulation.dt_base, Path::new(&path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {path}");
    }
}

fn axis_apply(name: &str) -> Option<Box<dyn Fn(&mut ScenarioConfig, f64) + Sync + Send>> {
    use harvest_sim::config::{CapacitorConfig, ConverterConfig, LoadConfig};

    match name {
        "capacitor.capacitance" => Some(Box::new(|cfg, v| match &mut cfg.capacitor {
            CapacitorConfig::IdealCapacitor(s) => s.capacitance = v,
            CapacitorConfig::TantalumCapacitor(s) => s.capacitance = v,
        })),
        "capacitor.v_initial" => Some(Box::new(|cfg, v| match &mut cfg.capacitor {
            CapacitorConfig::IdealCapacitor(s) => s.v_initial = v,
            CapacitorConfig::TantalumCapacitor(s) => s.v_initial = v,
        })),
        "converter.v_ov" => Some(Box::new(|cfg, v| match &mut cfg.converter {
            ConverterConfig::Diode(s) => s.v_ov = v,
            ConverterConfig::Hysteresis(s) => s.v_ov = v,
            ConverterConfig::BuckConverter(s) => s.v_ov = v,
            ConverterConfig::BuckBoost(s) => s.v_ov = v,
            ConverterConfig::Ldo(_) | ConverterConfig::Bq25570(_) => {}
        })),
        "load.current" => Some(Box::new(|cfg, v| {
            if let LoadConfig::ConstantLoad(s) = &mut cfg.load {
                s.current = v;
            }
        })),
        _ => None,
    }
}

fn metric_spec(name: &str) -> Option<MetricSpec> {
    match name {
        "v_cap_final" => Some(MetricSpec::new("v_cap_final", |sim| sim.log().last().map(|r| r.v_cap).unwrap_or(0.0))),
        "v_cap_min" => Some(MetricSpec::new("v_cap_min", |sim| {
            sim.log().iter().map(|r| r.v_cap).fold(f64::INFINITY, f64::min)
        })),
        "v_cap_max" => Some(MetricSpec::new("v_cap_max", |sim| {
            sim.log().iter().map(|r| r.v_cap).fold(f64::NEG_INFINITY, f64::max)
        })),
        "step_count" => Some(MetricSpec::new("step_count", |sim| sim.log().len() as f64)),
        _ => None,
    }
}

fn parse_axis(spec: &str) -> SweepAxis {
    let (name, values) = spec.split_once('=').unwrap_or_else(|| {
        eprintln!("error: --axis must be of the form name=v1,v2,…, got \"{spec}\"");
        process::exit(1);
    });
    let apply = axis_apply(name).unwrap_or_else(|| {
        eprintln!("error: unrecognized axis name \"{name}\" (see --help)");
        process::exit(1);
    });
    let values: Vec<f64> = values
        .split(',')
        .map(|v| {
            v.trim().parse::<f64>().unwrap_or_else(|_| {
                eprintln!("error: axis \"{name}\" value \"{v}\" is not a valid number");
                process::exit(1);
            })
        })
        .collect();
    SweepAxis { name: name.to_string(), values, apply }
}

fn run_sweep_cmd(args: &[String]) {
    let mut scenario_path = None;
    let mut preset = None;
    let mut axis_specs = Vec::new();
    let mut metric_names = Vec::new();
    let mut out_path = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => scenario_path = Some(require_arg(args, &mut i, "--scenario")),
            "--preset" => preset = Some(require_arg(args, &mut i, "--preset")),
            "--axis" => axis_specs.push(require_arg(args, &mut i, "--axis")),
            "--metric" => metric_names.push(require_arg(args, &mut i, "--metric")),
            "--out" => out_path = Some(require_arg(args, &mut i, "--out")),
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if axis_specs.is_empty() {
        eprintln!("error: sweep requires at least one --axis");
        process::exit(1);
    }
    if metric_names.is_empty() {
        metric_names.push("v_cap_final".to_string());
    }

    let base = load_scenario(&scenario_path, &preset);
    let axes: Vec<SweepAxis> = axis_specs.iter().map(|s| parse_axis(s)).collect();
    let metrics: Vec<MetricSpec> = metric_names
        .iter()
        .map(|n| {
            metric_spec(n).unwrap_or_else(|| {
                eprintln!("error: unrecognized metric name \"{n}\" (see --help)");
                process::exit(1);
            })
        })
        .collect();

    let outcome = run_sweep(&base, axes, metrics, SweepSettings::default());

    if let Some(path) = out_path {
        let file = std::fs::File::create(&path).unwrap_or_else(|e| {
            eprintln!("error: cannot create \"{path}\": {e}");
            process::exit(1);
        });
        if let Err(e) = export::write_sweep_csv(&outcome.rows, file) {
            eprintln!("error: failed to write sweep CSV: {e}");
            process::exit(1);
        }
        eprintln!("Wrote {} rows to {path}", outcome.rows.len());
    } else {
        let mut buf = Vec::new();
        export::write_sweep_csv(&outcome.rows, &mut buf).unwrap();
        print!("{}", String::from_utf8_lossy(&buf));
    }

    if !outcome.errors.is_empty() {
        eprintln!("\n{} job(s) failed:", outcome.errors.len());
        for e in &outcome.errors {
            let params: Vec<String> = e.params.iter().map(|(n, v)| format!("{n}={v}")).collect();
            eprintln!("  [{}]: {}", params.join(", "), e.message);
        }
        process::exit(1);
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_help();
        process::exit(1);
    }

    match args[1].as_str() {
        "simulate" => run_simulate(&args[2..]),
        "sweep" => run_sweep_cmd(&args[2..]),
        "--help" | "-h" => print_help(),
        other => {
            eprintln!("error: unknown subcommand \"{other}\"");
            print_help();
            process::exit(1);
        }
    }
}
