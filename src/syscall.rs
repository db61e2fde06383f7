//! System call dispatch (`ecall`, selector in `a7`).
//!
//! A narrow trait the core calls into by selector, with one concrete
//! implementation (here, real process stdio) and room for hosts or tests to
//! supply their own.

use std::io::{Read, Write};

use crate::error::SimulationFault;
use crate::memory::Memory;
use crate::register::{FloatRegisters, IntRegisters, Register};

/// Register conventions shared by every syscall: arguments in `a0`-`a2`
/// (`x10`-`x12`), the float argument in `fa0` (`f10`), return values in
/// `a0`/`a1`.
const A0: usize = 10;
const A1: usize = 11;
const A2: usize = 12;
const A7: usize = 17;
const FA0: usize = 10;

pub enum SyscallEffect {
    Continue,
    Exit(i32),
}

/// Implemented by whatever performs a program's actual I/O. The core
/// dispatches by selector; the handler owns the file descriptors, buffers
/// and any host-specific behavior (a test harness typically records calls
/// instead of touching real stdio).
pub trait SyscallHandler {
    fn dispatch(
        &mut self,
        selector: u32,
        int_regs: &mut IntRegisters,
        float_regs: &mut FloatRegisters,
        memory: &mut Memory,
        heap_ptr: &mut u32,
    ) -> Result<SyscallEffect, SimulationFault>;
}

/// Reads a NUL-terminated string starting at `addr`.
fn read_c_string(memory: &mut Memory, addr: u32) -> Result<String, SimulationFault> {
    let mut bytes = Vec::new();
    let mut cursor = addr;
    loop {
        let b = memory.load_byte(cursor)?;
        if b == 0 {
            break;
        }
        bytes.push(b);
        cursor = cursor.wrapping_add(1);
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The standard handler: real stdin/stdout over the full syscall table.
#[derive(Default)]
pub struct StdSyscallHandler;

impl SyscallHandler for StdSyscallHandler {
    fn dispatch(
        &mut self,
        selector: u32,
        int_regs: &mut IntRegisters,
        float_regs: &mut FloatRegisters,
        memory: &mut Memory,
        heap_ptr: &mut u32,
    ) -> Result<SyscallEffect, SimulationFault> {
        match selector {
            1 => {
                print!("{}", int_regs.read(A0).i());
                let _ = std::io::stdout().flush();
            }
            2 => {
                print!("{}", float_regs.read(FA0).f());
                let _ = std::io::stdout().flush();
            }
            4 => {
                let s = read_c_string(memory, int_regs.read(A0).u())?;
                print!("{}", s);
                let _ = std::io::stdout().flush();
            }
            5 => {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line).ok();
                let value: i32 = line.trim().parse().unwrap_or(0);
                int_regs.write(A0, Register::from_i32(value));
            }
            6 => {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line).ok();
                let value: f32 = line.trim().parse().unwrap_or(0.0);
                float_regs.write(FA0, Register::from_f32(value));
            }
            8 => {
                let buf_addr = int_regs.read(A0).u();
                let max_len = int_regs.read(A1).u();
                let mut line = String::new();
                std::io::stdin().read_line(&mut line).ok();
                let bytes = line.into_bytes();
                let len = bytes.len().min(max_len.saturating_sub(1) as usize);
                for (i, b) in bytes.iter().take(len).enumerate() {
                    memory.store_byte(buf_addr.wrapping_add(i as u32), *b)?;
                }
                memory.store_byte(buf_addr.wrapping_add(len as u32), 0)?;
            }
            9 => {
                let requested = int_regs.read(A0).i();
                if requested < 0 {
                    int_regs.write(A0, Register::from_i32(-1));
                } else {
                    let prior = *heap_ptr;
                    *heap_ptr = heap_ptr.wrapping_add(requested as u32);
                    int_regs.write(A0, Register::from_u32(prior));
                }
            }
            10 => return Ok(SyscallEffect::Exit(0)),
            11 => {
                let byte = int_regs.read(A0).u() as u8 as char;
                print!("{}", byte);
                let _ = std::io::stdout().flush();
            }
            12 => {
                let mut byte = [0u8; 1];
                let _ = std::io::stdin().read_exact(&mut byte);
                int_regs.write(A0, Register::from_i32(byte[0] as i32));
            }
            13 | 14 | 15 | 16 => {
                // File I/O (open/read/write/close): not backed by a real
                // filesystem in this simulator; report failure via -1
                // rather than pretending to succeed.
                int_regs.write(A0, Register::from_i32(-1));
            }
            17 => {
                let code = int_regs.read(A0).i();
                return Ok(SyscallEffect::Exit(code));
            }
            30 => {
                let millis = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                int_regs.write(A0, Register::from_u32(millis as u32));
                int_regs.write(A1, Register::from_u32((millis >> 32) as u32));
            }
            34 => {
                print!("{:#x}", int_regs.read(A0).u());
                let _ = std::io::stdout().flush();
            }
            35 => {
                print!("{:#b}", int_regs.read(A0).u());
                let _ = std::io::stdout().flush();
            }
            36 => {
                print!("{}", int_regs.read(A0).u());
                let _ = std::io::stdout().flush();
            }
            _ => return Err(SimulationFault::IllegalInstruction(selector)),
        }
        Ok(SyscallEffect::Continue)
    }
}

pub fn selector(int_regs: &IntRegisters) -> u32 {
    int_regs.read(A7).u()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::memory::Segments;

    #[test]
    fn exit_selector_reports_code() {
        let mut int_regs = IntRegisters::default();
        let mut float_regs = FloatRegisters::default();
        let mut memory = Memory::new(Segments::default(), CacheConfig::default()).unwrap();
        let mut heap = 0u32;
        int_regs.write(A0, Register::from_i32(7));
        let mut handler = StdSyscallHandler::default();
        match handler
            .dispatch(17, &mut int_regs, &mut float_regs, &mut memory, &mut heap)
            .unwrap()
        {
            SyscallEffect::Exit(code) => assert_eq!(code, 7),
            SyscallEffect::Continue => panic!("expected exit"),
        }
    }

    #[test]
    fn sbrk_advances_heap_pointer() {
        let mut int_regs = IntRegisters::default();
        let mut float_regs = FloatRegisters::default();
        let mut memory = Memory::new(Segments::default(), CacheConfig::default()).unwrap();
        let mut heap = 0x1000u32;
        int_regs.write(A0, Register::from_i32(64));
        let mut handler = StdSyscallHandler::default();
        handler
            .dispatch(9, &mut int_regs, &mut float_regs, &mut memory, &mut heap)
            .unwrap();
        assert_eq!(int_regs.read(A0).u(), 0x1000);
        assert_eq!(heap, 0x1040);
    }
}
