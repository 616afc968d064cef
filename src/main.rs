//! Swap Memory Simulator - Main Entry Point
//!
//! Usage: swap_memory [OPTIONS]
//!
//! Without `--trace`, runs the built-in demonstration workload. In both
//! cases the fragmentation result, memory table and access log are printed
//! to stdout once the run completes.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use swap_memory::constants::*;
use swap_memory::io::{render_access_log, render_fragmentation, render_memory_table, write_results, Trace};
use swap_memory::{logging, workload, MemoryConfig, Mmu, PhysicalMemory, SwapFile};

/// Simulated virtual memory with a file-backed swap space
#[derive(Parser, Debug)]
#[command(name = "swap_memory", version)]
struct Cli {
    /// Size of the virtual address space in bytes
    #[arg(long, default_value_t = VIRTUAL_MEMORY_SIZE)]
    virtual_size: usize,

    /// Size of physical memory (and of the swap file) in bytes
    #[arg(long, default_value_t = PHYSICAL_MEMORY_SIZE)]
    physical_size: usize,

    /// Page size in bytes (power of two)
    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Swap backing file, recreated zero-filled on start
    #[arg(long, default_value = SWAP_BACKING_PATH)]
    swap_file: PathBuf,

    /// Trace of read/write/swap-out operations to replay instead of the demo
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write the bytes returned by trace reads to this file
    #[arg(long, requires = "trace")]
    output: Option<PathBuf>,

    /// Leave the swap file in place on exit
    #[arg(long)]
    keep_swap: bool,

    /// Print swap and fault diagnostics
    #[arg(long, short)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = MemoryConfig::new(cli.virtual_size, cli.physical_size, cli.page_size)
        .context("Invalid memory geometry")?;
    info!(
        "{} virtual pages, {} physical pages of {} bytes",
        config.virtual_page_count(),
        config.page_count(),
        config.page_size()
    );

    let swap = SwapFile::create(&cli.swap_file, &config)
        .with_context(|| format!("Failed to prepare swap file {}", cli.swap_file.display()))?;
    let mut mmu = Mmu::new(PhysicalMemory::new(config), swap)?;

    let report = match &cli.trace {
        Some(path) => {
            let trace = Trace::from_file(path)
                .with_context(|| format!("Failed to load trace {}", path.display()))?;
            info!("replaying {} operations from {}", trace.operations.len(), path.display());

            let reads = trace.run(&mut mmu).context("Trace replay failed")?;
            if let Some(output) = &cli.output {
                write_results(output, &reads)
                    .with_context(|| format!("Failed to write results to {}", output.display()))?;
                info!("{} read results written to {}", reads.len(), output.display());
            }
            mmu.memory().is_fragmented()
        }
        None => workload::run_demo(&mut mmu).context("Demo workload failed")?,
    };

    print!("{}", render_fragmentation(&report));
    println!();
    print!("{}", render_memory_table(mmu.memory()));
    println!();
    print!("{}", render_access_log(mmu.access_log()));

    let (_, swap, _) = mmu.into_parts();
    if cli.keep_swap {
        info!("swap file kept at {}", swap.path().display());
    } else {
        swap.remove().context("Failed to remove swap file")?;
    }

    Ok(())
}
