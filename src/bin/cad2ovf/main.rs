//! cad2ovf - slice STL meshes into OVF jobs and inspect OVF files.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use ovf::config::JobConfig;
use ovf::convert::convert;
use ovf::slicer::MeshSlicer;
use ovf::OvfReader;

#[derive(Parser)]
#[command(name = "cad2ovf", version, about = "Slice CAD meshes into Open Vector Format jobs")]
struct Cli {
    /// Show progress logs (RUST_LOG is honoured when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all logs
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Slice an STL file and write the layers as an OVF job
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Layer height in mm, overrides the configuration file
        #[arg(long)]
        layer_height: Option<f64>,
        /// JSON job configuration
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the structure of an OVF file
    Info {
        file: PathBuf,
        /// Read with buffered I/O instead of memory mapping
        #[arg(long)]
        no_mmap: bool,
    },
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::Convert {
            input,
            output,
            layer_height,
            config,
        } => cmd_convert(input, output, layer_height, config),
        Commands::Info { file, no_mmap } => cmd_info(file, !no_mmap),
    }
}

fn cmd_convert(
    input: PathBuf,
    output: PathBuf,
    layer_height: Option<f64>,
    config: Option<PathBuf>,
) -> Result<()> {
    let mut config = match &config {
        Some(path) => JobConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => JobConfig::default(),
    };
    if let Some(h) = layer_height {
        config.layer_height_mm = h;
    }
    if config.job_name.is_empty() {
        config.job_name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    let created = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let slicer = MeshSlicer::from_stl(&input)
        .with_context(|| format!("reading {}", input.display()))?;
    info!(triangles = slicer.mesh().len(), "loaded mesh");

    let summary = convert(
        &slicer,
        &output,
        &config.to_job(created),
        config.layer_height_mm,
        &config.convert_options(),
    )
    .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} -> {}: {} work planes, {} vector blocks",
        input.display(),
        output.display(),
        summary.work_planes,
        summary.vector_blocks
    );
    Ok(())
}

fn cmd_info(file: PathBuf, use_mmap: bool) -> Result<()> {
    let reader = OvfReader::open_opts(&file, use_mmap)
        .with_context(|| format!("opening {}", file.display()))?;
    let job = reader.job_shell()?;
    let count = reader.num_work_planes()?;

    println!("File: {} ({} bytes)", file.display(), reader.size());
    println!("Job: {}", job.name());
    if let Some(meta) = &job.job_meta_data {
        if !meta.author.is_empty() {
            println!("Author: {}", meta.author);
        }
        println!("Version: {}", meta.version);
    }
    println!("Marking params: {}", job.marking_params_map.len());
    println!("Parts: {}", job.parts_map.len());
    println!("Work planes: {count}");

    for i in 0..count {
        let plane = reader.work_plane_shell(i)?;
        let lut = reader.work_plane_lut(i)?;
        println!(
            "  [{:>4}] z={:.4} mm  blocks={}",
            plane.work_plane_number,
            plane.z_pos_in_mm,
            lut.vector_blocks_positions.len()
        );
    }
    Ok(())
}
