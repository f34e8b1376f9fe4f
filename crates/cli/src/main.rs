//! SurtGeo CLI - kriging factors and spectral simulation

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use surtgeo_algorithms::geostats::{
    fac2real, write_real_array, CovarianceStructure, FacToRealParams, FactorsRecord, KrigingParams,
    OrdinaryKrige, OutOfRange, PointCheck, SpecSim2d,
};
use surtgeo_algorithms::io::{read_gslib, read_struct_file, GslibData, GslibParams};
use surtgeo_core::io::read_array;
use surtgeo_core::{Diagnostics, StructuredGrid};
use surtgeo_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "surtgeo")]
#[command(author, version, about = "Kriging factors and spectral simulation", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ordinary kriging factors for every cell of a grid
    Krige {
        /// Structure file
        #[arg(long)]
        structures: PathBuf,
        /// Structure to use (default: first in file)
        #[arg(long)]
        structure: Option<String>,
        /// GSLIB file with the conditioning points
        #[arg(long)]
        points: PathBuf,
        #[command(flatten)]
        columns: GslibColumns,
        #[command(flatten)]
        grid: GridArgs,
        /// Integer zone array matching the grid
        #[arg(long)]
        zones: Option<PathBuf>,
        /// Minimum points inside the search radius
        #[arg(long, default_value = "1")]
        min_points: usize,
        /// Maximum neighbours per cell
        #[arg(long, default_value = "20")]
        max_points: usize,
        #[arg(long, default_value = "1e10")]
        search_radius: f64,
        /// Record failed solves as unestimated cells
        #[arg(long)]
        forgive: bool,
        /// Drop points closer than the resolvable distance
        #[arg(long)]
        rectify: bool,
        /// Worker threads (1 = sequential)
        #[arg(short, long, default_value = "1")]
        threads: usize,
        /// Output factors file
        #[arg(short, long)]
        output: PathBuf,
        /// Output kriging variance array
        #[arg(long)]
        variance: Option<PathBuf>,
    },
    /// Apply a factors file to point values
    Fac2real {
        /// Factors file
        #[arg(short, long)]
        factors: PathBuf,
        /// GSLIB file with the point values, named pt0, pt1, ... in row order
        #[arg(long)]
        values: PathBuf,
        #[command(flatten)]
        columns: GslibColumns,
        #[arg(long, default_value = "-1e30")]
        lower_limit: f64,
        #[arg(long, default_value = "1e30")]
        upper_limit: f64,
        #[arg(long, default_value = "1e30")]
        fill_value: f64,
        /// Clamp out-of-range values to the limits instead of filling
        #[arg(long)]
        clamp: bool,
        /// Output array
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Unconditional FFT spectral simulation
    Simulate {
        /// Structure file
        #[arg(long)]
        structures: PathBuf,
        /// Structure to use (default: first in file)
        #[arg(long)]
        structure: Option<String>,
        #[command(flatten)]
        grid: GridArgs,
        /// Number of realizations
        #[arg(short, long, default_value = "1")]
        num_reals: usize,
        /// Mean of every realization (arithmetic space for log structures)
        #[arg(long, default_value = "1.0")]
        mean: f64,
        #[arg(long, default_value = "0")]
        seed: u64,
        #[arg(short, long, default_value = "1")]
        threads: usize,
        /// Output prefix; realization i is written to <prefix><i>.ref
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct GridArgs {
    /// X of the upper-left corner
    #[arg(long)]
    origin_x: f64,
    /// Y of the upper-left corner
    #[arg(long)]
    origin_y: f64,
    #[arg(long)]
    ncol: usize,
    #[arg(long)]
    nrow: usize,
    #[arg(long)]
    cell_size: f64,
}

#[derive(Args)]
struct GslibColumns {
    /// Value attribute (default: third of exactly three)
    #[arg(long)]
    attr: Option<String>,
    #[arg(long, default_value = "0")]
    x_col: usize,
    #[arg(long, default_value = "1")]
    y_col: usize,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn report(diagnostics: &Diagnostics) {
    if !diagnostics.is_empty() {
        println!("  Warnings: {}", diagnostics.len());
    }
}

fn build_grid(args: &GridArgs) -> Result<StructuredGrid> {
    StructuredGrid::uniform(args.origin_x, args.origin_y, args.ncol, args.nrow, args.cell_size)
        .context("Invalid grid")
}

fn read_points(path: &Path, columns: &GslibColumns) -> Result<GslibData> {
    let params = GslibParams {
        attr_name: columns.attr.clone(),
        x_idx: columns.x_col,
        y_idx: columns.y_col,
    };
    let data = read_gslib(path, &params).context("Failed to read GSLIB file")?;
    info!("Points: {} from {}", data.points.len(), path.display());
    Ok(data)
}

fn select_structure(path: &Path, name: Option<&str>) -> Result<CovarianceStructure> {
    let (structures, diagnostics) = read_struct_file(path).context("Failed to read structure file")?;
    report(&diagnostics);
    let gs = match name {
        Some(n) => structures
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(n))
            .with_context(|| format!("Structure '{}' not found in {}", n, path.display()))?,
        None => structures
            .into_iter()
            .next()
            .with_context(|| format!("No structures in {}", path.display()))?,
    };
    info!("Structure: {}", gs);
    Ok(gs)
}

fn read_zones(path: &Path, nrow: usize, ncol: usize) -> Result<ndarray::Array2<i32>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let arr = read_array(BufReader::new(file), nrow, ncol).context("Failed to read zone array")?;
    Ok(arr.mapv(|v| v.round() as i32))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Krige {
            structures,
            structure,
            points,
            columns,
            grid,
            zones,
            min_points,
            max_points,
            search_radius,
            forgive,
            rectify,
            threads,
            output,
            variance,
        } => {
            let gs = select_structure(&structures, structure.as_deref())?;
            let data = read_points(&points, &columns)?;
            let grid = build_grid(&grid)?;
            let (nrow, ncol) = grid.shape();
            let zone_array = zones.as_deref().map(|p| read_zones(p, nrow, ncol)).transpose()?;

            let ok = OrdinaryKrige::new(gs, data.points, PointCheck { rectify })
                .context("Failed to set up kriging")?;
            report(ok.diagnostics());

            let params = KrigingParams {
                min_points,
                max_points,
                search_radius,
                forgive,
                mode: ProcessingMode::from_threads(threads),
            };
            let start = Instant::now();
            let pb = spinner("Computing kriging factors...")?;
            let gk = ok
                .calc_factors_grid(&grid, zone_array.as_ref(), &params)
                .context("Kriging failed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();
            info!("Estimated {} of {} cells", gk.batch.num_estimated(), gk.batch.len());
            report(&gk.batch.diagnostics);

            let zone_name = zones
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            FactorsRecord::from_grid_kriging(&gk, &points.display().to_string(), &zone_name)?
                .write_file(&output)
                .context("Failed to write factors file")?;
            done("Factors", &output, elapsed);

            if let Some(path) = variance {
                gk.write_variance(create(&path)?)
                    .context("Failed to write variance array")?;
                println!("Variance saved to: {}", path.display());
            }
        }

        Commands::Fac2real {
            factors,
            values,
            columns,
            lower_limit,
            upper_limit,
            fill_value,
            clamp,
            output,
        } => {
            let record = FactorsRecord::read_file(&factors).context("Failed to read factors file")?;
            let data = read_points(&values, &columns)?;
            let params = FacToRealParams {
                lower_limit,
                upper_limit,
                fill_value,
                out_of_range: if clamp { OutOfRange::Clamp } else { OutOfRange::Fill },
            };
            let start = Instant::now();
            let raster = fac2real(&record, &data.values_by_name(), &params).context("fac2real failed")?;
            write_real_array(&raster, create(&output)?).context("Failed to write array")?;
            done("Array", &output, start.elapsed());
        }

        Commands::Simulate {
            structures,
            structure,
            grid,
            num_reals,
            mean,
            seed,
            threads,
            output,
        } => {
            let gs = select_structure(&structures, structure.as_deref())?;
            let grid = build_grid(&grid)?;
            let pb = spinner("Building spectral kernel...")?;
            let sim = SpecSim2d::new(grid, gs)
                .context("Failed to set up simulation")?
                .with_mode(ProcessingMode::from_threads(threads));
            pb.set_message(format!("Drawing {} realizations...", num_reals));
            let start = Instant::now();
            let reals = sim
                .draw(num_reals, mean, &mut StdRng::seed_from_u64(seed))
                .context("Simulation failed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            for (i, real) in reals.iter().enumerate() {
                let path = PathBuf::from(format!("{}{}.ref", output.display(), i));
                write_real_array(real, create(&path)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            println!("{} realizations saved with prefix: {}", reals.len(), output.display());
            println!("  Processing time: {:.2?}", elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulate_defaults() {
        let cli = Cli::try_parse_from([
            "surtgeo", "simulate", "--structures", "s.dat", "--origin-x", "0", "--origin-y", "0",
            "--ncol", "4", "--nrow", "3", "--cell-size", "1", "-o", "real",
        ])
        .unwrap();
        match cli.command {
            Commands::Simulate { mean, num_reals, .. } => {
                assert_eq!(mean, 1.0);
                assert_eq!(num_reals, 1);
            }
            _ => panic!("expected simulate"),
        }
    }
}
