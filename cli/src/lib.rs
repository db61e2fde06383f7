//! The narrow host-facing facade tying `jupiter-asm`, `jupiter-link` and
//! `jupiter-core` together: assemble, link, run. This is the library surface
//! a GUI or REPL would be built on top of, not one itself — it has no
//! stepping commands beyond what `jupiter_core::Driver` already exposes and
//! no notion of a terminal session.
//!
//! There is nothing on the other side of this boundary calling through a
//! `*mut` handle, so `Simulation` is a plain owned Rust type instead of an
//! opaque-pointer C FFI surface.

use jupiter_asm::{AssembleOptions, Diagnostic, SourceFile, TranslationUnit};
use jupiter_core::cache::{CacheConfig, CacheConfigError};
use jupiter_core::constants::DEFAULT_HISTORY_SIZE;
use jupiter_core::sink::ChangeSink;
use jupiter_core::syscall::{StdSyscallHandler, SyscallHandler};
use jupiter_core::{Driver, SimulationFault};
use jupiter_link::{LinkError, LinkOptions, LinkedImage};

/// Runs the assembler over a set of files. A thin re-export of
/// `jupiter_asm::assemble` under the facade's own name, kept here so callers
/// depend on one crate instead of three.
pub fn assemble(
    files: &[SourceFile],
    options: &AssembleOptions,
) -> Result<Vec<TranslationUnit>, Vec<Diagnostic>> {
    jupiter_asm::assemble(files, options)
}

/// Links assembled units into a loadable image. A thin re-export of
/// `jupiter_link::link`, see [`assemble`].
pub fn link(units: &[TranslationUnit], options: &LinkOptions) -> Result<LinkedImage, Vec<LinkError>> {
    jupiter_link::link(units, options)
}

/// Everything a [`Simulation`] needs besides the linked image itself.
/// `bare_machine`/`extrict` are assembler-phase-only and belong on
/// [`AssembleOptions`] instead.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub history_size: usize,
    pub self_modifying: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            history_size: DEFAULT_HISTORY_SIZE,
            self_modifying: false,
        }
    }
}

/// A running program: a thin wrapper around [`Driver`] exposing
/// step/run/backstep/reset/breakpoints plus read-only register and memory
/// accessors, nothing more.
pub struct Simulation {
    driver: Driver,
}

impl Simulation {
    /// Builds a simulation from a freshly linked image, initializing `sp` to
    /// the stack top and `gp` to the heap base, and wiring the standard
    /// stdio syscall handler.
    pub fn new(image: LinkedImage, config: &SimulationConfig) -> Self {
        Self::with_syscalls(image, config, Box::new(StdSyscallHandler::default()))
    }

    /// As [`Simulation::new`], but with a caller-supplied syscall handler —
    /// a test harness wanting to capture stdio instead of touching the real
    /// streams uses this.
    pub fn with_syscalls(
        image: LinkedImage,
        config: &SimulationConfig,
        syscalls: Box<dyn SyscallHandler>,
    ) -> Self {
        let mut driver = Driver::new(
            image.memory,
            image.entry_pc,
            image.heap_base,
            config.history_size,
            syscalls,
        );
        driver.set_self_modifying(config.self_modifying);
        Simulation { driver }
    }

    /// Installs a change sink. Entirely optional.
    pub fn set_sink(&mut self, sink: Box<dyn ChangeSink>) {
        self.driver.set_sink(sink);
    }

    pub fn clear_sink(&mut self) {
        self.driver.clear_sink();
    }

    pub fn step(&mut self) -> Result<(), SimulationFault> {
        self.driver.step()
    }

    pub fn run(&mut self, cancel: impl FnMut() -> bool) -> SimulationFault {
        self.driver.run(cancel)
    }

    /// Runs to completion with no cancellation — the shape the `jupiter`
    /// binary needs for a non-interactive run.
    pub fn run_to_fault(&mut self) -> SimulationFault {
        self.driver.run(|| false)
    }

    pub fn backstep(&mut self) -> bool {
        self.driver.backstep()
    }

    pub fn reset(&mut self) {
        self.driver.reset()
    }

    pub fn set_breakpoint(&mut self, addr: u32) {
        self.driver.set_breakpoint(addr);
    }

    pub fn clear_breakpoints(&mut self) {
        self.driver.clear_breakpoints();
    }

    pub fn reconfigure_cache(&mut self, config: CacheConfig) -> Result<(), CacheConfigError> {
        self.driver.reconfigure_cache(config)
    }

    pub fn pc(&self) -> u32 {
        self.driver.pc()
    }

    pub fn int_register(&self, index: usize) -> u32 {
        self.driver.int_register(index)
    }

    pub fn float_register(&self, index: usize) -> u32 {
        self.driver.float_register(index)
    }

    pub fn heap_ptr(&self) -> u32 {
        self.driver.heap_ptr()
    }

    pub fn memory(&self) -> &jupiter_core::memory::Memory {
        self.driver.memory()
    }
}

/// Where a [`run_pipeline`] call stopped: the assembler, the linker, or a
/// simulation that ran to a fault (which includes a clean `Halt`).
pub enum PipelineOutcome {
    AssembleFailed(Vec<Diagnostic>),
    LinkFailed(Vec<LinkError>),
    Ran {
        globals: std::collections::HashMap<String, u32>,
        fault: SimulationFault,
    },
}

/// Top-level convenience combining assemble + link + run-to-completion. The
/// `jupiter` binary is a thin argument-parsing wrapper around exactly this.
pub fn run_pipeline(
    files: &[SourceFile],
    assemble_options: &AssembleOptions,
    link_options: &LinkOptions,
    sim_config: &SimulationConfig,
) -> PipelineOutcome {
    let units = match assemble(files, assemble_options) {
        Ok(units) => units,
        Err(diags) => return PipelineOutcome::AssembleFailed(diags),
    };
    let image = match link(&units, link_options) {
        Ok(image) => image,
        Err(errs) => return PipelineOutcome::LinkFailed(errs),
    };
    let globals = image.globals.clone();
    let mut sim = Simulation::new(image, sim_config);
    let fault = sim.run_to_fault();
    PipelineOutcome::Ran { globals, fault }
}

#[cfg(test)]
mod test {
    use super::*;

    fn run(source: &str) -> PipelineOutcome {
        let files = [SourceFile::new("a.s", source)];
        run_pipeline(
            &files,
            &AssembleOptions::default(),
            &LinkOptions::default(),
            &SimulationConfig::default(),
        )
    }

    #[test]
    fn pipeline_runs_a_program_to_exit() {
        match run("__start:\n  addi a0, zero, 7\n  addi a7, zero, 17\n  ecall\n") {
            PipelineOutcome::Ran { fault, .. } => assert_eq!(fault, SimulationFault::Halt(7)),
            PipelineOutcome::AssembleFailed(diags) => panic!("assemble failed: {diags:?}"),
            PipelineOutcome::LinkFailed(errs) => panic!("link failed: {errs:?}"),
        }
    }

    #[test]
    fn pipeline_reports_assemble_errors() {
        match run("bogus a0\n") {
            PipelineOutcome::AssembleFailed(diags) => assert!(!diags.is_empty()),
            _ => panic!("expected an assemble failure"),
        }
    }

    #[test]
    fn pipeline_reports_link_errors_for_missing_entry() {
        match run("nop\n") {
            PipelineOutcome::LinkFailed(errs) => assert!(!errs.is_empty()),
            _ => panic!("expected a link failure"),
        }
    }

    #[test]
    fn simulation_exposes_step_and_backstep() {
        let files = [SourceFile::new(
            "a.s",
            "__start:\n  addi a0, zero, 7\n  addi a7, zero, 17\n  ecall\n",
        )];
        let units = assemble(&files, &AssembleOptions::default()).unwrap();
        let image = link(&units, &LinkOptions::default()).unwrap();
        let mut sim = Simulation::new(image, &SimulationConfig::default());
        sim.step().unwrap();
        assert_eq!(sim.int_register(10), 7);
        assert!(sim.backstep());
        assert_eq!(sim.int_register(10), 0);
    }
}
