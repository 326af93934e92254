//! LZ Drift CLI - attractor radii, drift trajectories and collector fields
//!
//! Usage:
//!     lzdrift radii --from 1 --to 10
//!     lzdrift simulate --attractors 3,5,7 --time-span 100 --points 1000
//!     lzdrift --json field --target 5 --stride 5
//!     lzdrift --config drift.json scenario

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lzdrift_core::{
    report::{drift_records, drift_summaries, format_thousands},
    AttractorMap, DriftConfig, DriftError, DriftSign, FieldGrid, HarmonicIndex,
    IntegrationMethod, QuiverArrow, RunReport, Scenario, TrajectorySimulator,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "lzdrift")]
#[command(about = "Harmonic attractor radii and orbital drift simulation")]
#[command(version)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit a JSON report instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print predicted attractor radii
    Radii {
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        from: HarmonicIndex,

        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        to: HarmonicIndex,
    },

    /// Integrate particle drift in the resonance potential
    Simulate {
        /// Attractor indices forming the potential
        #[arg(long, value_delimiter = ',', default_values_t = vec![3, 5, 7])]
        attractors: Vec<HarmonicIndex>,

        /// Initial radii in km (defaults to the demonstration particles)
        #[arg(long, value_delimiter = ',')]
        radii: Vec<f64>,

        #[arg(long)]
        time_span: Option<f64>,

        #[arg(long)]
        points: Option<usize>,

        #[arg(long, value_enum)]
        method: Option<Method>,

        #[arg(long, value_enum)]
        sign: Option<Sign>,

        /// Integrate particles on worker threads
        #[arg(long)]
        parallel: bool,

        /// Include every (particle, time, radius, velocity) row
        #[arg(long)]
        records: bool,
    },

    /// Sample the collector field around one attractor
    Field {
        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        target: HarmonicIndex,

        #[arg(long, default_value_t = 100)]
        resolution: usize,

        /// Grid half-width in units of the target radius
        #[arg(long, default_value_t = 1.5)]
        extent: f64,

        /// Quiver subsampling stride
        #[arg(long, default_value_t = 5)]
        stride: usize,
    },

    /// Run the full demonstration scenario
    Scenario,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Method {
    Adaptive,
    Rk4,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Sign {
    Descend,
    Ascend,
}

#[derive(Serialize)]
struct FieldOutput {
    field: FieldGrid,
    quiver: Vec<QuiverArrow>,
}

fn main() {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lzdrift=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        tracing::debug!(code = e.error_code(), "command failed");
        if json {
            println!("{}", render_error(&e, true));
        } else {
            eprintln!("{}", render_error(&e, false));
        }
        std::process::exit(1);
    }
}

/// Error line for stdout (`--json`) or stderr
fn render_error(e: &DriftError, json: bool) -> String {
    if json {
        e.to_json().to_string()
    } else {
        format!("Error [{}]: {}", e.error_code(), e)
    }
}

fn run(cli: Cli) -> Result<(), DriftError> {
    let mut config = match &cli.config {
        Some(path) => DriftConfig::from_file(path)?,
        None => DriftConfig::default(),
    };

    match cli.command {
        Command::Radii { from, to } => {
            if from > to {
                return Err(DriftError::invalid_input(
                    "from",
                    format!("{from} is greater than --to {to}"),
                ));
            }
            let simulator = TrajectorySimulator::new(config)?;
            let map = AttractorMap::build(simulator.model(), from..=to);
            if cli.json {
                println!("{}", RunReport::new(&config, map).to_json_pretty()?);
            } else {
                print!("{}", map.render_table());
            }
        }

        Command::Simulate {
            attractors,
            radii,
            time_span,
            points,
            method,
            sign,
            parallel,
            records,
        } => {
            if let Some(span) = time_span {
                config.simulation.time_span = span;
            }
            if let Some(points) = points {
                config.simulation.num_points = points;
            }
            if let Some(method) = method {
                config.integrator.method = match method {
                    Method::Adaptive => IntegrationMethod::Adaptive,
                    Method::Rk4 => IntegrationMethod::FixedStep,
                };
            }
            if let Some(sign) = sign {
                config.dynamics.drift_sign = match sign {
                    Sign::Descend => DriftSign::Descend,
                    Sign::Ascend => DriftSign::Ascend,
                };
            }
            config.simulation.parallel |= parallel;

            let simulator = TrajectorySimulator::new(config)?;
            let model = simulator.model();
            let radii = if radii.is_empty() {
                Scenario::default().initial_radii(model)
            } else {
                radii
            };

            let trajectories = simulator.run(&radii, &attractors)?;
            let summaries = drift_summaries(&trajectories, &model.attractors(&attractors));

            if cli.json {
                let payload = serde_json::json!({
                    "attractors": model.attractors(&attractors),
                    "summaries": summaries,
                    "records": records.then(|| drift_records(&trajectories)),
                });
                println!("{}", RunReport::new(&config, payload).to_json_pretty()?);
            } else {
                println!(
                    "Integrator: {} | t = {} | {} samples",
                    simulator.integrator_name(),
                    config.simulation.time_span,
                    config.simulation.num_points
                );
                for s in &summaries {
                    let nearest = match (s.nearest_attractor, s.distance_to_nearest_km) {
                        (Some(n), Some(d)) => format!("n={} ({} km away)", n, format_thousands(d, 3)),
                        _ => "none".to_string(),
                    };
                    println!(
                        "Particle {}: {} → {} km, v = {:.3e}, nearest {}",
                        s.particle,
                        format_thousands(s.initial_radius_km, 2),
                        format_thousands(s.final_radius_km, 2),
                        s.final_velocity,
                        nearest
                    );
                }
                if records {
                    println!("particle,time,radius,velocity");
                    for r in drift_records(&trajectories) {
                        println!("{},{},{},{}", r.particle, r.time, r.radius, r.velocity);
                    }
                }
            }
        }

        Command::Field {
            target,
            resolution,
            extent,
            stride,
        } => {
            let simulator = TrajectorySimulator::new(config)?;
            let field = FieldGrid::sample(simulator.model(), config.field, target, resolution, extent)?;
            let quiver = field.quiver(stride);
            if cli.json {
                let payload = FieldOutput { field, quiver };
                println!("{}", RunReport::new(&config, payload).to_json_pretty()?);
            } else {
                println!(
                    "Collector field n={}: radius {} km, {}x{} grid, peak {:.4}, {} arrows",
                    target,
                    format_thousands(field.target_radius_km, 2),
                    field.resolution,
                    field.resolution,
                    field.max_value(),
                    quiver.len()
                );
            }
        }

        Command::Scenario => {
            let output = Scenario::default().run(&config)?;
            if cli.json {
                println!("{}", RunReport::new(&config, output).to_json_pretty()?);
            } else {
                print!("{}", output.attractor_map.render_table());
                println!();
                for s in &output.summaries {
                    println!(
                        "Particle {}: {} → {} km (net {} km)",
                        s.particle,
                        format_thousands(s.initial_radius_km, 2),
                        format_thousands(s.final_radius_km, 2),
                        format_thousands(s.net_drift_km, 4)
                    );
                }
                println!(
                    "Collector field n={}: peak {:.4}, {} quiver arrows",
                    output.field.target_index,
                    output.field.max_value(),
                    output.quiver.len()
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_harmonic_indices_parse() {
        let cli = Cli::try_parse_from(["lzdrift", "field", "--target", "-1"]).unwrap();
        assert!(matches!(cli.command, Command::Field { target: -1, .. }));

        let cli = Cli::try_parse_from(["lzdrift", "radii", "--from", "-3", "--to", "2"]).unwrap();
        assert!(matches!(cli.command, Command::Radii { from: -3, to: 2 }));
    }

    #[test]
    fn test_simulate_flags() {
        let cli = Cli::try_parse_from([
            "lzdrift", "--json", "simulate", "--attractors", "4,6", "--method", "rk4",
            "--sign", "ascend", "--points", "11",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Simulate {
                attractors,
                method,
                sign,
                points,
                ..
            } => {
                assert_eq!(attractors, vec![4, 6]);
                assert!(matches!(method, Some(Method::Rk4)));
                assert!(matches!(sign, Some(Sign::Ascend)));
                assert_eq!(points, Some(11));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_error_output_carries_code() {
        let err = DriftError::invalid_input("from", "3 is greater than --to 1");
        let text = render_error(&err, false);
        assert!(text.starts_with("Error [INVALID_INPUT]: "));
        assert!(text.contains("from"));

        let json: serde_json::Value = serde_json::from_str(&render_error(&err, true)).unwrap();
        assert_eq!(json["error"]["code"], "INVALID_INPUT");
    }

    #[test]
    fn test_reversed_range_rejected() {
        let cli = Cli::try_parse_from(["lzdrift", "radii", "--from", "5", "--to", "2"]).unwrap();
        let err = run(cli).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
    }
}
