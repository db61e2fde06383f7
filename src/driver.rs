//! The simulation driver: fetch-decode-execute loop, breakpoints, and the
//! glue between [`crate::history`] and the register/memory/cache state it
//! snapshots around each instruction.

use std::collections::HashSet;

use crate::cache::CacheConfig;
use crate::constants::{INSTRUCTION_SIZE, STACK_TOP};
use crate::error::SimulationFault;
use crate::history::{DiffBuilder, History};
use crate::isa::{ExecContext, Registry};
use crate::memory::Memory;
use crate::register::{FloatRegisters, IntRegisters, Register, RegisterFile};
use crate::sink::{ChangeEvent, ChangeSink};
use crate::syscall::SyscallHandler;

const SP: usize = 2;
const GP: usize = 3;

/// The value a [`Driver`] was constructed from, kept around so `reset` can
/// restore the pre-execution image without re-linking.
#[derive(Clone)]
struct InitialState {
    memory: Memory,
    int_regs: IntRegisters,
    float_regs: FloatRegisters,
    pc: u32,
    heap_ptr: u32,
}

/// Owns all architectural state for one linked program: register files,
/// memory (with its embedded cache), the program counter, the heap
/// pointer, reversible history, and breakpoints. Single-writer — nothing
/// here is `Sync`, and the host must not call `step` while a `run` loop
/// from another thread is in flight.
pub struct Driver {
    int_regs: IntRegisters,
    float_regs: FloatRegisters,
    pc: u32,
    heap_ptr: u32,
    memory: Memory,
    history: History,
    registry: Registry,
    syscalls: Box<dyn SyscallHandler>,
    breakpoints: HashSet<u32>,
    breakpoint_armed: bool,
    initial: InitialState,
    sink: Option<Box<dyn ChangeSink>>,
}

impl Driver {
    /// Builds a driver for a freshly linked program. `entry_pc` is the
    /// address of the bootstrap pair the linker emits; `sp` is initialized
    /// to the stack top and `gp` to `heap_base`.
    pub fn new(
        memory: Memory,
        entry_pc: u32,
        heap_base: u32,
        history_size: usize,
        syscalls: Box<dyn SyscallHandler>,
    ) -> Self {
        let mut int_regs = IntRegisters::default();
        int_regs.restore(SP, Register::from_u32(STACK_TOP));
        int_regs.restore(GP, Register::from_u32(heap_base));
        let float_regs = FloatRegisters::default();

        let initial = InitialState {
            memory: memory.clone(),
            int_regs: int_regs.clone(),
            float_regs: float_regs.clone(),
            pc: entry_pc,
            heap_ptr: heap_base,
        };

        Driver {
            int_regs,
            float_regs,
            pc: entry_pc,
            heap_ptr: heap_base,
            memory,
            history: History::new(history_size),
            registry: crate::isa::new_standard_registry(),
            syscalls,
            breakpoints: HashSet::new(),
            breakpoint_armed: true,
            initial,
            sink: None,
        }
    }

    /// Installs a change sink: the core will feed it a
    /// `RegisterChanged`/`MemoryChanged`/`CacheBlockStateChanged` event for
    /// every side effect of every subsequently executed instruction.
    /// Entirely optional — nothing in the driver depends on one being set.
    pub fn set_sink(&mut self, sink: Box<dyn ChangeSink>) {
        self.sink = Some(sink);
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn heap_ptr(&self) -> u32 {
        self.heap_ptr
    }

    pub fn int_register(&self, index: usize) -> u32 {
        self.int_regs.read(index).u()
    }

    pub fn float_register(&self, index: usize) -> u32 {
        self.float_regs.read(index).u()
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn set_breakpoint(&mut self, addr: u32) {
        self.breakpoints.insert(addr);
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
        self.breakpoint_armed = true;
    }

    /// Reconfigures the cache. Only permitted while history is empty.
    pub fn reconfigure_cache(&mut self, config: CacheConfig) -> Result<(), crate::cache::CacheConfigError> {
        assert!(self.history.is_empty(), "cache reconfiguration requires empty history");
        self.memory.cache_mut().reconfigure(config)
    }

    pub fn set_self_modifying(&mut self, enabled: bool) {
        self.memory.set_self_modifying(enabled);
    }

    /// Executes the next instruction, committing a history diff on success.
    /// Returns the fault that suspended execution otherwise (a breakpoint,
    /// a halt, or an actual error): faults are returned to the host, never
    /// unwound as a generic Rust error out of the loop.
    pub fn step(&mut self) -> Result<(), SimulationFault> {
        if self.breakpoints.contains(&self.pc) {
            if self.breakpoint_armed {
                self.breakpoint_armed = false;
                return Err(SimulationFault::Breakpoint(self.pc));
            }
            self.breakpoint_armed = true;
        }

        let word = self.memory.fetch_word(self.pc)?;
        let def = self
            .registry
            .decode(word)
            .ok_or(SimulationFault::IllegalInstruction(word))?;
        let operands = def.decode_operands(word);

        let int_snapshot = self.int_regs.snapshot();
        let float_snapshot = self.float_regs.snapshot();
        let prior_heap = self.heap_ptr;
        let cache_backup = self.memory.cache().clone();
        self.memory.begin_recording();

        let mut ctx = ExecContext {
            pc: self.pc,
            next_pc: self.pc,
            int_regs: &mut self.int_regs,
            float_regs: &mut self.float_regs,
            memory: &mut self.memory,
            heap_ptr: &mut self.heap_ptr,
            syscalls: self.syscalls.as_mut(),
        };
        let result = (def.execute)(&mut ctx, operands);
        let next_pc = ctx.next_pc;

        let mut builder = DiffBuilder::open(self.pc, prior_heap, cache_backup);
        for (index, (prior, now)) in int_snapshot.iter().zip(self.int_regs.snapshot().iter()).enumerate() {
            if prior != now {
                builder.record_register(RegisterFile::Integer, index, *prior);
                if let Some(sink) = self.sink.as_mut() {
                    sink.on_change(ChangeEvent::RegisterChanged {
                        file: RegisterFile::Integer,
                        index,
                        new_value: now.u(),
                    });
                }
            }
        }
        for (index, (prior, now)) in float_snapshot.iter().zip(self.float_regs.snapshot().iter()).enumerate() {
            if prior != now {
                builder.record_register(RegisterFile::Float, index, *prior);
                if let Some(sink) = self.sink.as_mut() {
                    sink.on_change(ChangeEvent::RegisterChanged {
                        file: RegisterFile::Float,
                        index,
                        new_value: now.u(),
                    });
                }
            }
        }
        for (addr, prior_byte) in self.memory.take_recording() {
            builder.record_memory(addr, prior_byte);
            if let Some(sink) = self.sink.as_mut() {
                sink.on_change(ChangeEvent::MemoryChanged {
                    addr,
                    new_value: self.memory.peek_byte(addr),
                });
            }
        }
        for (index, state) in self.memory.take_cache_events() {
            if let Some(sink) = self.sink.as_mut() {
                sink.on_change(ChangeEvent::CacheBlockStateChanged { index, state });
            }
        }
        self.history.push(builder.finish());

        match result {
            Ok(()) => {
                self.pc = next_pc;
                Ok(())
            }
            Err(fault) => Err(fault),
        }
    }

    /// Steps until a fault suspends execution or `cancel` reports true
    /// (checked between instructions only). Returns the fault
    /// that ended the run; a caller-requested cancellation is reported as
    /// `Ok(())`-shaped by the caller checking `cancel` itself, so `run`
    /// only ever returns once a genuine fault (including Halt) occurs or
    /// cancellation is observed.
    pub fn run(&mut self, mut cancel: impl FnMut() -> bool) -> SimulationFault {
        loop {
            if cancel() {
                return SimulationFault::Breakpoint(self.pc);
            }
            if let Err(fault) = self.step() {
                return fault;
            }
        }
    }

    /// Pops the most recent history diff and restores PC, registers,
    /// memory and cache to their pre-step values.
    pub fn backstep(&mut self) -> bool {
        let diff = match self.history.pop() {
            Some(diff) => diff,
            None => return false,
        };
        self.pc = diff.prior_pc;
        self.heap_ptr = diff.prior_heap_ptr;
        for ((file, index), value) in diff.registers {
            match file {
                RegisterFile::Integer => self.int_regs.restore(index, value),
                RegisterFile::Float => self.float_regs.restore(index, value),
            }
        }
        for (addr, byte) in diff.memory {
            self.memory.store_byte_privileged(addr, byte);
        }
        *self.memory.cache_mut() = diff.cache_backup;
        true
    }

    /// Drops all history and restores the driver to the state it had right
    /// after construction: drop all diffs, restore state, reload image.
    pub fn reset(&mut self) {
        self.history.clear();
        self.memory = self.initial.memory.clone();
        self.int_regs = self.initial.int_regs.clone();
        self.float_regs = self.initial.float_regs.clone();
        self.pc = self.initial.pc;
        self.heap_ptr = self.initial.heap_ptr;
        self.breakpoint_armed = true;
    }
}

pub enum StepOutcome {
    Continued,
    Suspended(SimulationFault),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::constants::TEXT_BEGIN;
    use crate::memory::Segments;
    use crate::syscall::StdSyscallHandler;

    fn driver_with(words: &[u32]) -> Driver {
        let segments = Segments {
            text_begin: TEXT_BEGIN,
            text_end: TEXT_BEGIN + 0x1000,
            rodata_begin: 0,
            rodata_end: 0,
            heap_base: 0x1000_1000,
        };
        let mut memory = Memory::new(segments, CacheConfig::default()).unwrap();
        for (i, word) in words.iter().enumerate() {
            memory.store_word_privileged(TEXT_BEGIN + (i as u32) * INSTRUCTION_SIZE, *word);
        }
        Driver::new(memory, TEXT_BEGIN, 0x1000_1000, 2000, Box::new(StdSyscallHandler::default()))
    }

    fn encode_addi(rd: u8, rs1: u8, imm: i32) -> u32 {
        let registry = crate::isa::new_standard_registry();
        let def = registry.lookup("addi").unwrap();
        def.encode(crate::isa::Operands { rd, rs1, imm, ..Default::default() })
    }

    #[test]
    fn step_advances_pc_and_writes_register() {
        let mut driver = driver_with(&[encode_addi(1, 0, 7)]);
        driver.step().unwrap();
        assert_eq!(driver.int_register(1), 7);
        assert_eq!(driver.pc(), TEXT_BEGIN + 4);
    }

    #[test]
    fn backstep_restores_register_and_pc() {
        let mut driver = driver_with(&[encode_addi(1, 0, 7)]);
        driver.step().unwrap();
        assert!(driver.backstep());
        assert_eq!(driver.int_register(1), 0);
        assert_eq!(driver.pc(), TEXT_BEGIN);
    }

    #[test]
    fn reset_drops_history_and_reloads_image() {
        let mut driver = driver_with(&[encode_addi(1, 0, 7)]);
        driver.step().unwrap();
        driver.reset();
        assert_eq!(driver.int_register(1), 0);
        assert_eq!(driver.pc(), TEXT_BEGIN);
        assert_eq!(driver.history_len(), 0);
    }

    #[test]
    fn breakpoint_suspends_then_disarms() {
        let mut driver = driver_with(&[encode_addi(1, 0, 1), encode_addi(2, 0, 2)]);
        driver.set_breakpoint(TEXT_BEGIN);
        match driver.step() {
            Err(SimulationFault::Breakpoint(addr)) => assert_eq!(addr, TEXT_BEGIN),
            other => panic!("expected breakpoint, got {:?}", other.err()),
        }
        // Armed flag is now false: the same address steps past this time.
        driver.step().unwrap();
        assert_eq!(driver.int_register(1), 1);
    }

    #[derive(Clone, Default)]
    struct RecordingSink(std::rc::Rc<std::cell::RefCell<Vec<ChangeEvent>>>);

    impl ChangeSink for RecordingSink {
        fn on_change(&mut self, event: ChangeEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    #[test]
    fn sink_observes_register_change_on_step() {
        let mut driver = driver_with(&[encode_addi(1, 0, 7)]);
        let sink = RecordingSink::default();
        let events = sink.0.clone();
        driver.set_sink(Box::new(sink));
        driver.step().unwrap();
        assert!(events.borrow().iter().any(|e| matches!(
            e,
            ChangeEvent::RegisterChanged { file: RegisterFile::Integer, index: 1, new_value: 7 }
        )));
    }

    #[test]
    fn clear_sink_stops_future_notifications() {
        let mut driver = driver_with(&[encode_addi(1, 0, 7), encode_addi(2, 0, 9)]);
        let sink = RecordingSink::default();
        let events = sink.0.clone();
        driver.set_sink(Box::new(sink));
        driver.step().unwrap();
        driver.clear_sink();
        driver.step().unwrap();
        assert!(events.borrow().iter().all(|e| !matches!(
            e,
            ChangeEvent::RegisterChanged { index: 2, .. }
        )));
    }
}
