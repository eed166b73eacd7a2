use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use li_core::PhysConstants;
use li_melt::{
    BlowingSnowPolicy, Forcing, GridCell, LakeState, MeltError, MeltOutput, SnowState,
    ice_melt_step,
};

#[derive(Parser)]
#[command(name = "li-cli")]
#[command(about = "Lake ice melt driver - snow/ice surface energy balance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario file without running it
    Validate {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
    },
    /// Run a scenario and print per-step output
    Run {
        /// Path to the scenario YAML file
        scenario_path: PathBuf,
        /// Emit one JSON object per step instead of the text table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid scenario: {0}")]
    Invalid(String),
    #[error(transparent)]
    Melt(#[from] MeltError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

/// On-disk scenario: initial state plus a forcing series.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Scenario {
    /// Physical constants; omit for the standard values
    #[serde(default)]
    constants: PhysConstants,
    snow: SnowInit,
    lake: LakeInit,
    /// Uniform blowing-snow sublimation applied every step (m/timestep)
    #[serde(default)]
    blowing_flux_m: Option<f64>,
    forcing: Vec<Forcing>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SnowInit {
    swe_m: f64,
    #[serde(default)]
    surface_liquid_m: f64,
    #[serde(default)]
    surface_temp_c: f64,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct LakeInit {
    ice_thickness_m: f64,
    ice_fraction: f64,
    volume_m3: f64,
    surface_area_m2: Vec<f64>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            json,
        } => cmd_run(&scenario_path, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: &Path) -> CliResult<Scenario> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let scenario: Scenario = serde_yaml::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if scenario.forcing.is_empty() {
        return Err(CliError::Invalid(
            "scenario needs at least one forcing record".to_string(),
        ));
    }
    Ok(scenario)
}

fn build_cell(scenario: &Scenario) -> CliResult<GridCell> {
    let snow = SnowState::new(
        scenario.snow.swe_m,
        scenario.snow.surface_liquid_m,
        scenario.snow.surface_temp_c,
    )?;
    let lake = LakeState::new(
        scenario.lake.ice_thickness_m,
        scenario.lake.ice_fraction,
        scenario.lake.volume_m3,
        scenario.lake.surface_area_m2.clone(),
    )?;
    Ok(GridCell { snow, lake })
}

fn blowing_policy(scenario: &Scenario) -> BlowingSnowPolicy {
    match scenario.blowing_flux_m {
        Some(v) => BlowingSnowPolicy::Prescribed(v),
        None => BlowingSnowPolicy::Disabled,
    }
}

fn cmd_validate(scenario_path: &Path) -> CliResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = load_scenario(scenario_path)?;
    build_cell(&scenario)?;
    println!("✓ Scenario is valid ({} forcing records)", scenario.forcing.len());
    Ok(())
}

/// Per-step record emitted in `--json` mode.
#[derive(serde::Serialize)]
struct StepRecord<'a> {
    step: usize,
    surface_temp_c: f64,
    swe_m: f64,
    surface_liquid_m: f64,
    ice_thickness_m: f64,
    vapor_flux_m: f64,
    mass_balance_error_m: f64,
    #[serde(flatten)]
    output: &'a MeltOutput,
}

fn cmd_run(scenario_path: &Path, json: bool) -> CliResult<()> {
    let scenario = load_scenario(scenario_path)?;
    let mut cell = build_cell(&scenario)?;
    let blowing = blowing_policy(&scenario);

    tracing::info!(
        steps = scenario.forcing.len(),
        swe_m = cell.snow.swe_m,
        ice_thickness_m = cell.lake.ice_thickness_m,
        "starting scenario"
    );

    // Step one at a time so partial output survives a mid-series failure
    let mut total_surface_melt_mm = 0.0;
    let mut total_ice_melt_m = 0.0;
    if !json {
        println!(
            "{:>5} {:>9} {:>9} {:>9} {:>9} {:>10} {:>10}",
            "step", "tsurf_C", "swe_m", "liquid_m", "hice_m", "melt_mm", "icemelt_m"
        );
    }
    for (step, forcing) in scenario.forcing.iter().enumerate() {
        let out = ice_melt_step(
            &scenario.constants,
            forcing,
            &mut cell.snow,
            &mut cell.lake,
            blowing,
        )?;
        total_surface_melt_mm += out.surface_melt_mm;
        total_ice_melt_m += out.ice_melt_to_lake_m;

        if json {
            let record = StepRecord {
                step,
                surface_temp_c: cell.snow.surface_temp_c,
                swe_m: cell.snow.swe_m,
                surface_liquid_m: cell.snow.surface_liquid_m,
                ice_thickness_m: cell.lake.ice_thickness_m,
                vapor_flux_m: cell.snow.vapor_flux_m,
                mass_balance_error_m: cell.snow.mass_balance_error_m,
                output: &out,
            };
            println!("{}", serde_json::to_string(&record)?);
        } else {
            println!(
                "{:>5} {:>9.3} {:>9.5} {:>9.5} {:>9.4} {:>10.4} {:>10.6}",
                step,
                cell.snow.surface_temp_c,
                cell.snow.swe_m,
                cell.snow.surface_liquid_m,
                cell.lake.ice_thickness_m,
                out.surface_melt_mm,
                out.ice_melt_to_lake_m
            );
        }
    }

    if !json {
        println!("\n✓ Scenario completed: {} steps", scenario.forcing.len());
        println!("  Surface melt: {:.4} mm", total_surface_melt_mm);
        println!("  Lake ice melted: {:.6} m", total_ice_melt_m);
        println!("  Final swe: {:.5} m", cell.snow.swe_m);
        println!("  Final ice thickness: {:.4} m", cell.lake.ice_thickness_m);
    }
    Ok(())
}
