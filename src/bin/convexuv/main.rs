//! convexuv CLI - repair folded UV parameterizations.
//!
//! Usage: convexuv <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `convexuv --help` for available commands. Set `RUST_LOG=debug` to
//! follow the repair stages.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use convexuv::algo::parameterize::{
    find_boundary_intersection, repair_flips_with_progress, MvcOptions, Preconditioner, UVMap,
};
use convexuv::algo::Progress;
use convexuv::io;
use convexuv::mesh::HalfEdgeMesh;

#[derive(Parser)]
#[command(name = "convexuv")]
#[command(author, version, about = "UV flip repair CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh and UV information
    Info {
        /// Input mesh file (with texture coordinates)
        input: PathBuf,
    },

    /// Repair flipped triangles in the UV map
    Repair {
        /// Input mesh file (with texture coordinates)
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Maximum number of solver iterations per axis
        #[arg(long, default_value = "1000")]
        max_iterations: usize,

        /// Relative residual tolerance of the solver
        #[arg(short, long, default_value = "1e-10")]
        tolerance: f64,

        /// Preconditioner used by BiCGSTAB
        #[arg(short, long, value_enum, default_value = "ilu0")]
        preconditioner: PreconditionerArg,

        /// Skip the boundary self-intersection check
        #[arg(long)]
        no_boundary_check: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PreconditionerArg {
    /// Incomplete LU factorization with zero fill-in
    Ilu0,
    /// Diagonal scaling
    Jacobi,
    /// No preconditioning
    None,
}

impl From<PreconditionerArg> for Preconditioner {
    fn from(arg: PreconditionerArg) -> Self {
        match arg {
            PreconditionerArg::Ilu0 => Preconditioner::Ilu0,
            PreconditionerArg::Jacobi => Preconditioner::Jacobi,
            PreconditionerArg::None => Preconditioner::Identity,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Repair {
            input,
            output,
            max_iterations,
            tolerance,
            preconditioner,
            no_boundary_check,
            sequential,
        } => {
            let mut options = MvcOptions::default()
                .with_max_iterations(max_iterations)
                .with_tolerance(tolerance)
                .with_preconditioner(preconditioner.into())
                .with_parallel(!sequential);
            if no_boundary_check {
                options = options.without_boundary_check();
            }
            cmd_repair(&input, &output, &options)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that draws a bar on stderr.
fn create_progress() -> Progress {
    let last_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let percent = (current.min(total) * 100) / total;
        // Stages only move forward, so a smaller value is a stale update.
        if last_percent.fetch_max(percent, Ordering::Relaxed) > percent {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        eprint!(
            "\r[{}{}] {:3}% {:<40}",
            "=".repeat(filled),
            " ".repeat(bar_width - filled),
            percent,
            message
        );
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn print_uv_summary(mesh: &HalfEdgeMesh, uv: &UVMap) {
    if let Some((min, max)) = uv.bounding_box() {
        println!(
            "UV bounds: ({:.4}, {:.4}) to ({:.4}, {:.4})",
            min.x, min.y, max.x, max.y
        );
    }
    println!(
        "Flipped faces: {} of {}",
        uv.count_flipped_faces(mesh),
        mesh.num_faces()
    );
}

fn cmd_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let (mesh, uv): (HalfEdgeMesh, UVMap) = io::load_with_uvs(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Half-edges: {}", mesh.num_halfedges());

    let loops = mesh.boundary_loops();
    if loops.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        let lengths: Vec<usize> = loops
            .iter()
            .map(|&he| mesh.loop_halfedges(he).count())
            .collect();
        println!(
            "Topology: Open ({} boundary loops, lengths {:?})",
            loops.len(),
            lengths
        );
    }

    print_uv_summary(&mesh, &uv);

    if let Some(border) = mesh.longest_boundary_loop() {
        match find_boundary_intersection(&mesh, border, &uv, true) {
            None => println!("UV border: simple"),
            Some(hit) => println!(
                "UV border: self-intersecting (segments {:?} and {:?})",
                hit.first_segment, hit.second_segment
            ),
        }
    }

    Ok(())
}

fn cmd_repair(
    input: &PathBuf,
    output: &PathBuf,
    options: &MvcOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mesh, mut uv): (HalfEdgeMesh, UVMap) = io::load_with_uvs(input)?;

    log::info!(
        "Loaded {}: {} vertices, {} faces",
        input.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );
    print_uv_summary(&mesh, &uv);

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!("Repairing UV map with mean value coordinates ({})...", mode);

    let progress = create_progress();
    let start = Instant::now();
    repair_flips_with_progress(&mesh, &mut uv, options, &progress)?;
    let elapsed = start.elapsed();

    print_uv_summary(&mesh, &uv);

    io::save_with_uvs(&mesh, &uv, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}
