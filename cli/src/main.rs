//! Non-interactive smoke-test binary: assembles, links and runs one or more
//! source files to completion or fault, then prints the result, in one
//! command rather than assemble-to-file then separately run.
//!
//! Deliberately not an interactive front-end: no REPL, no stepping
//! commands, no breakpoint UI. It runs once and exits.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use jupiter::{run_pipeline, PipelineOutcome, Simulation, SimulationConfig};
use jupiter_asm::{AssembleOptions, SourceFile};
use jupiter_core::cache::{CacheConfig, ReplacementPolicy};
use jupiter_core::constants::{
    DEFAULT_CACHE_ASSOCIATIVITY, DEFAULT_CACHE_BLOCK_SIZE, DEFAULT_CACHE_NUM_BLOCKS,
    DEFAULT_ENTRY_SYMBOL, DEFAULT_HISTORY_SIZE,
};
use jupiter_core::sink::{ChangeEvent, ChangeSink};
use jupiter_core::SimulationFault;
use jupiter_link::LinkOptions;

/// Prints the PC ahead of each instruction and every register it touches —
/// wired in only when `--debug` is passed, since a sink is always optional.
struct TracingSink;

impl ChangeSink for TracingSink {
    fn on_change(&mut self, event: ChangeEvent) {
        match event {
            ChangeEvent::RegisterChanged { file, index, new_value } => {
                eprintln!("  {:?}[{}] <- 0x{:08x}", file, index, new_value);
            }
            ChangeEvent::MemoryChanged { addr, new_value } => {
                eprintln!("  mem[0x{:08x}] <- 0x{:02x}", addr, new_value);
            }
            ChangeEvent::CacheBlockStateChanged { .. } => {}
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Policy {
    Lru,
    Fifo,
    Rand,
}

impl From<Policy> for ReplacementPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Lru => ReplacementPolicy::Lru,
            Policy::Fifo => ReplacementPolicy::Fifo,
            Policy::Rand => ReplacementPolicy::Rand,
        }
    }
}

/// Assembles, links and runs RV32IMF programs end to end, one flag per
/// configuration option.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Source files to assemble and link together.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Entry symbol the linker resolves the bootstrap jump to.
    #[arg(long, default_value = DEFAULT_ENTRY_SYMBOL)]
    entry: String,

    /// Disables pseudo-instruction expansion, accepting only base encodings.
    #[arg(long)]
    bare_machine: bool,

    /// Demotes extrict mode: warnings no longer become errors.
    #[arg(long)]
    no_extrict: bool,

    /// Permits writes to the text segment at runtime.
    #[arg(long)]
    self_modifying: bool,

    /// Prints every step's program counter and changed registers as it runs.
    #[arg(long)]
    debug: bool,

    /// Reversible-history depth; 0 disables back-step bookkeeping entirely.
    #[arg(long, default_value_t = DEFAULT_HISTORY_SIZE)]
    history_size: usize,

    #[arg(long, default_value_t = DEFAULT_CACHE_BLOCK_SIZE)]
    cache_block_size: u32,

    #[arg(long, default_value_t = DEFAULT_CACHE_NUM_BLOCKS)]
    cache_num_blocks: u32,

    #[arg(long, default_value_t = DEFAULT_CACHE_ASSOCIATIVITY)]
    cache_associativity: u32,

    #[arg(long, value_enum, default_value_t = Policy::Lru)]
    cache_policy: Policy,

    /// Writes the linked program's text segment out in dump format instead
    /// of running it.
    #[arg(long, value_name = "PATH")]
    dump: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut files = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        match fs::read_to_string(path) {
            Ok(text) => files.push(SourceFile::new(path.display().to_string(), text)),
            Err(err) => {
                eprintln!("reading \"{}\" failed: {}", path.display(), err);
                return ExitCode::FAILURE;
            }
        }
    }

    let assemble_options = AssembleOptions {
        extrict: !cli.no_extrict,
        bare_machine: cli.bare_machine,
    };
    let link_options = LinkOptions {
        entry_symbol: cli.entry.clone(),
        cache_config: CacheConfig {
            block_size: cli.cache_block_size,
            num_blocks: cli.cache_num_blocks,
            associativity: cli.cache_associativity,
            policy: cli.cache_policy.into(),
        },
    };
    let sim_config = SimulationConfig {
        history_size: cli.history_size,
        self_modifying: cli.self_modifying,
    };

    if let Some(dump_path) = &cli.dump {
        return match jupiter::assemble(&files, &assemble_options) {
            Ok(units) => match jupiter::link(&units, &link_options) {
                Ok(image) => {
                    let blocks = jupiter_dump::from_linked_image(&units, &image);
                    match jupiter_dump::write_file(dump_path, &blocks) {
                        Ok(()) => ExitCode::SUCCESS,
                        Err(err) => {
                            eprintln!("writing dump failed: {}", err);
                            ExitCode::FAILURE
                        }
                    }
                }
                Err(errs) => {
                    report_link_errors(&errs);
                    ExitCode::FAILURE
                }
            },
            Err(diags) => {
                report_diagnostics(&diags);
                ExitCode::FAILURE
            }
        };
    }

    if cli.debug {
        return run_traced(&files, &assemble_options, &link_options, &sim_config);
    }

    match run_pipeline(&files, &assemble_options, &link_options, &sim_config) {
        PipelineOutcome::AssembleFailed(diags) => {
            report_diagnostics(&diags);
            ExitCode::FAILURE
        }
        PipelineOutcome::LinkFailed(errs) => {
            report_link_errors(&errs);
            ExitCode::FAILURE
        }
        PipelineOutcome::Ran { fault, .. } => report_fault(fault, false),
    }
}

/// Runs the same assemble-link-run pipeline [`run_pipeline`] does, but steps
/// one instruction at a time with a [`TracingSink`] installed instead of
/// running straight to completion, since `--debug` is the only caller that
/// needs per-step visibility.
fn run_traced(
    files: &[SourceFile],
    assemble_options: &AssembleOptions,
    link_options: &LinkOptions,
    sim_config: &SimulationConfig,
) -> ExitCode {
    let units = match jupiter::assemble(files, assemble_options) {
        Ok(units) => units,
        Err(diags) => {
            report_diagnostics(&diags);
            return ExitCode::FAILURE;
        }
    };
    let image = match jupiter::link(&units, link_options) {
        Ok(image) => image,
        Err(errs) => {
            report_link_errors(&errs);
            return ExitCode::FAILURE;
        }
    };

    let mut sim = Simulation::new(image, sim_config);
    sim.set_sink(Box::new(TracingSink));

    loop {
        eprintln!("pc=0x{:08x}", sim.pc());
        match sim.step() {
            Ok(()) => {}
            Err(fault) => return report_fault(fault, true),
        }
    }
}

fn report_diagnostics(diags: &[jupiter_asm::Diagnostic]) {
    for diag in diags {
        eprintln!("{}", diag);
    }
}

fn report_link_errors(errs: &[jupiter_link::LinkError]) {
    for err in errs {
        eprintln!("{}", err);
    }
}

fn report_fault(fault: SimulationFault, debug: bool) -> ExitCode {
    if debug {
        eprintln!("{}", fault);
    }
    match fault {
        SimulationFault::Halt(code) => {
            if (0..=255).contains(&code) {
                ExitCode::from(code as u8)
            } else {
                eprintln!("exit code {} out of range, reporting 1", code);
                ExitCode::FAILURE
            }
        }
        other => {
            eprintln!("{}", other);
            ExitCode::FAILURE
        }
    }
}
