//! CVRPTW Solver - Command Line Interface
//!
//! Exact routing for the TSP and the CVRPTW from CSV inputs.

use clap::{Args, Parser, Subcommand};
use cvrptw_solver::config::SolverConfig;
use cvrptw_solver::error::Result;
use cvrptw_solver::exact::{self, BackendKind, SolveOutcome};
use cvrptw_solver::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use cvrptw_solver::instance::RoutingInstance;
use cvrptw_solver::io::{self, CvrptwFiles};
use cvrptw_solver::model::{RouteModelBuilder, SubtourStrategy};

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cvrptw-solver")]
#[command(version = "1.0")]
#[command(about = "Exact TSP and CVRPTW solver with branch-and-cut")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a TSP over every location of a travel matrix
    Tsp {
        /// Travel matrix CSV
        #[arg(short, long)]
        matrix: PathBuf,

        /// Start location code (defaults to the first code in the matrix)
        #[arg(long)]
        depot: Option<String>,

        #[command(flatten)]
        solver: SolverArgs,
    },

    /// Solve a capacitated vehicle routing problem with time windows
    Cvrptw {
        #[command(flatten)]
        files: CvrptwArgs,

        #[command(flatten)]
        solver: SolverArgs,
    },

    /// Print instance statistics and a quick tour estimate
    Analyze {
        /// Travel matrix CSV
        #[arg(short, long)]
        matrix: PathBuf,

        /// Locations CSV; with orders and trucks, analyze the CVRPTW instance
        #[arg(long, requires_all = ["orders", "trucks"])]
        locations: Option<PathBuf>,

        #[arg(long)]
        orders: Option<PathBuf>,

        #[arg(long)]
        trucks: Option<PathBuf>,

        #[arg(long)]
        depot: Option<String>,
    },
}

#[derive(Args)]
struct CvrptwArgs {
    /// Locations CSV with HH:MM loading windows
    #[arg(long)]
    locations: PathBuf,

    /// Orders CSV (destination code, total weight)
    #[arg(long)]
    orders: PathBuf,

    /// Trucks CSV (truck id, max weight)
    #[arg(long)]
    trucks: PathBuf,

    /// Travel matrix CSV
    #[arg(short, long)]
    matrix: PathBuf,

    /// Depot location code (defaults to the last listed location)
    #[arg(long)]
    depot: Option<String>,
}

#[derive(Args)]
struct SolverArgs {
    /// JSON solver configuration; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subtour elimination strategy
    #[arg(long, value_enum)]
    strategy: Option<SubtourStrategy>,

    /// MIP backend
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Time limit in seconds
    #[arg(short, long)]
    time_limit: Option<f64>,

    /// Relative MIP gap
    #[arg(long)]
    mip_gap: Option<f64>,

    /// Override the derived time-propagation Big-M
    #[arg(long)]
    big_m: Option<f64>,

    /// Skip the nearest-neighbor warm start
    #[arg(long)]
    no_warm_start: bool,

    /// Randomize the warm start tour with this seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output file for the solution (JSON)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl SolverArgs {
    fn to_config(&self, verbose: bool) -> Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => SolverConfig::from_file(path)?,
            None => SolverConfig::default(),
        };
        if let Some(strategy) = self.strategy {
            config.subtour = strategy;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(time_limit) = self.time_limit {
            config.time_limit = time_limit;
        }
        if let Some(gap) = self.mip_gap {
            config.mip_gap = gap;
        }
        if self.big_m.is_some() {
            config.big_m = self.big_m;
        }
        if self.no_warm_start {
            config.warm_start = false;
        }
        if self.seed.is_some() {
            config.warm_start_seed = self.seed;
        }
        config.verbose |= verbose;
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Tsp { matrix, depot, solver } => solver
            .to_config(cli.verbose)
            .and_then(|config| {
                let instance = io::load_tsp(&matrix, depot.as_deref())?;
                solve_instance(&instance, &config, solver.output)
            }),

        Commands::Cvrptw { files, solver } => solver
            .to_config(cli.verbose)
            .and_then(|config| {
                let instance = load_cvrptw(
                    &files.locations,
                    &files.orders,
                    &files.trucks,
                    &files.matrix,
                    files.depot.as_deref(),
                    &config,
                )?;
                solve_instance(&instance, &config, solver.output)
            }),

        Commands::Analyze { matrix, locations, orders, trucks, depot } => {
            analyze_instance(&matrix, locations.zip(orders).zip(trucks), depot.as_deref())
        }
    };

    if let Err(e) = result {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_cvrptw(
    locations: &Path,
    orders: &Path,
    trucks: &Path,
    matrix: &Path,
    depot: Option<&str>,
    config: &SolverConfig,
) -> Result<RoutingInstance> {
    let files = CvrptwFiles { locations, orders, trucks, matrix };
    let name = matrix.file_stem().and_then(|s| s.to_str()).unwrap_or("cvrptw");
    io::load_cvrptw(name, &files, depot, config.service)
}

fn solve_instance(
    instance: &RoutingInstance,
    config: &SolverConfig,
    output: Option<PathBuf>,
) -> Result<()> {
    instance.validate()?;
    if config.verbose {
        println!("{}", instance.statistics()?);
    }

    let outcome = exact::solve(instance, config)?;
    match &outcome {
        SolveOutcome::Solved(result) => {
            println!("{}", result.solution);
            if result.optimal {
                println!("Status: optimal ({} rounds, {} cuts)", result.rounds, result.cuts_added);
            } else {
                println!(
                    "Status: time limit reached, best incumbent (bound {:?})",
                    result.lower_bound
                );
            }
            let report = result.solution.check(instance);
            if !report.is_feasible() {
                for issue in &report.issues {
                    log::warn!("{}", issue);
                }
            }

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&result.solution)?;
                std::fs::write(&path, json)?;
                println!("Solution saved to {:?}", path);
            }
        }
        SolveOutcome::Infeasible => println!("Status: infeasible"),
        SolveOutcome::NoSolutionWithinLimit => {
            println!("Status: no solution within the time limit")
        }
    }
    Ok(())
}

fn analyze_instance(
    matrix: &Path,
    cvrptw: Option<((PathBuf, PathBuf), PathBuf)>,
    depot: Option<&str>,
) -> Result<()> {
    let instance = match &cvrptw {
        Some(((locations, orders), trucks)) => {
            load_cvrptw(locations, orders, trucks, matrix, depot, &SolverConfig::default())?
        }
        None => io::load_tsp(matrix, depot)?,
    };
    instance.validate()?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics()?);

    if !instance.vehicles.is_empty() {
        instance.validate_fleet()?;
        println!("\nFleet:");
        println!("  Trucks: {}", instance.vehicles.len());
        println!("  Total capacity: {:.2}", instance.total_capacity());
        println!("  Total demand: {:.2}", instance.total_demand());
        println!("  Schedule horizon: {:.0} min", instance.horizon()?);
        println!("  Derived Big-M: {:.0}", RouteModelBuilder::derived_big_m(&instance)?);
    }

    let nn = NearestNeighborHeuristic::new();
    let tour = nn.construct(&instance)?;
    println!("\nQuick Solution Estimates:");
    println!("  {}: {:.2}", nn.name(), instance.tour_length(&tour)?);
    Ok(())
}
