//! Sparse byte-addressable memory, segment layout and protection checks.
//!
//! The addressable space is 4 GiB and almost entirely unused, so storage is
//! a sparse map rather than a flat bounds-checked `Vec<u8>`; segment and
//! protection rules take the place bounds checks would otherwise play. The
//! cache sits layered in front of this store, inside `Memory` itself.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};

use crate::cache::{BlockState, Cache, CacheConfig, CacheConfigError};
use crate::constants::{RESERVED_HIGH_BEGIN, RESERVED_LOW_END, TEXT_BEGIN};
use crate::error::SimulationFault;

/// The statically-known segment boundaries of one linked program.
#[derive(Clone, Copy, Debug, Default)]
pub struct Segments {
    pub text_begin: u32,
    pub text_end: u32,
    pub rodata_begin: u32,
    pub rodata_end: u32,
    pub heap_base: u32,
}

impl Segments {
    fn text_writable(&self, addr: u32) -> bool {
        !(addr >= self.text_begin && addr < self.text_end)
    }

    fn rodata_writable(&self, addr: u32) -> bool {
        !(self.rodata_begin < self.rodata_end
            && addr >= self.rodata_begin
            && addr < self.rodata_end)
    }
}

/// Sparse byte-addressable store with a cache in front of it.
#[derive(Clone, Debug)]
pub struct Memory {
    bytes: HashMap<u32, u8>,
    segments: Segments,
    self_modifying: bool,
    cache: Cache,
    recording: Option<HashMap<u32, u8>>,
    cache_events: Option<Vec<(usize, BlockState)>>,
}

impl Memory {
    pub fn new(segments: Segments, cache_config: CacheConfig) -> Result<Self, CacheConfigError> {
        Ok(Memory {
            bytes: HashMap::new(),
            segments,
            self_modifying: false,
            cache: Cache::new(cache_config)?,
            recording: None,
            cache_events: None,
        })
    }

    /// Starts capturing the pre-write value of every byte address the next
    /// stores touch, for [`crate::history`] to restore on back-step, and
    /// every cache block state change, for a [`crate::sink::ChangeSink`]
    /// to observe.
    pub fn begin_recording(&mut self) {
        self.recording = Some(HashMap::new());
        self.cache_events = Some(Vec::new());
    }

    /// Stops capturing and returns the address→prior-byte map accumulated
    /// since [`Memory::begin_recording`].
    pub fn take_recording(&mut self) -> HashMap<u32, u8> {
        self.recording.take().unwrap_or_default()
    }

    /// Stops capturing and returns the cache block state changes
    /// accumulated since [`Memory::begin_recording`], in access order.
    pub fn take_cache_events(&mut self) -> Vec<(usize, BlockState)> {
        self.cache_events.take().unwrap_or_default()
    }

    /// Reads a byte without touching the cache or protection checks; used
    /// only to read back the post-write value for change-sink notification.
    pub fn peek_byte(&self, addr: u32) -> u8 {
        self.read_raw(addr)
    }

    pub fn segments(&self) -> Segments {
        self.segments
    }

    pub fn set_self_modifying(&mut self, enabled: bool) {
        self.self_modifying = enabled;
    }

    /// Whether misaligned half/word accesses are permitted — tied to the
    /// same self-modifying-mode flag that inverts the text-write rule.
    pub fn allows_misaligned(&self) -> bool {
        self.self_modifying
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut Cache {
        &mut self.cache
    }

    fn check(&self, addr: u32, read: bool) -> Result<(), SimulationFault> {
        if addr <= RESERVED_LOW_END || addr >= RESERVED_HIGH_BEGIN {
            return Err(SimulationFault::invalid_address(addr, read));
        }
        if read {
            return Ok(());
        }
        if !self.self_modifying && !self.segments.text_writable(addr) {
            return Err(SimulationFault::invalid_address(addr, false));
        }
        if !self.segments.rodata_writable(addr) {
            return Err(SimulationFault::invalid_address(addr, false));
        }
        Ok(())
    }

    fn read_raw(&self, addr: u32) -> u8 {
        *self.bytes.get(&addr).unwrap_or(&0)
    }

    /// Touches the cache for one byte address, returning whether it hit.
    fn touch_cache(&mut self, addr: u32, is_write: bool) -> bool {
        let (hit, state, index) = self.cache.access(addr, is_write);
        if let Some(events) = self.cache_events.as_mut() {
            events.push((index, state));
        }
        hit
    }

    fn load_checked(&mut self, addr: u32, len: u32) -> Result<[u8; 4], SimulationFault> {
        self.check(addr, true)?;
        let mut buf = [0u8; 4];
        let mut all_hit = true;
        for i in 0..len {
            all_hit &= self.touch_cache(addr.wrapping_add(i), false);
            buf[i as usize] = self.read_raw(addr.wrapping_add(i));
        }
        // One logical operation, regardless of how many bytes it touched:
        // a single hit only when every constituent byte hit.
        self.cache.record_access(all_hit);
        Ok(buf)
    }

    pub fn load_byte(&mut self, addr: u32) -> Result<u8, SimulationFault> {
        Ok(self.load_checked(addr, 1)?[0])
    }

    pub fn load_half(&mut self, addr: u32) -> Result<u16, SimulationFault> {
        let buf = self.load_checked(addr, 2)?;
        Ok(LittleEndian::read_u16(&buf[..2]))
    }

    pub fn load_word(&mut self, addr: u32) -> Result<u32, SimulationFault> {
        let buf = self.load_checked(addr, 4)?;
        Ok(LittleEndian::read_u32(&buf))
    }

    fn store_checked(&mut self, addr: u32, bytes: &[u8]) -> Result<(), SimulationFault> {
        self.check(addr, false)?;
        let mut all_hit = true;
        for (i, b) in bytes.iter().enumerate() {
            let target = addr.wrapping_add(i as u32);
            all_hit &= self.touch_cache(target, true);
            if let Some(recording) = self.recording.as_mut() {
                let prior = *self.bytes.get(&target).unwrap_or(&0);
                recording.entry(target).or_insert(prior);
            }
            self.bytes.insert(target, *b);
        }
        self.cache.record_access(all_hit);
        Ok(())
    }

    pub fn store_byte(&mut self, addr: u32, value: u8) -> Result<(), SimulationFault> {
        self.store_checked(addr, &[value])
    }

    pub fn store_half(&mut self, addr: u32, value: u16) -> Result<(), SimulationFault> {
        let mut buf = [0u8; 2];
        LittleEndian::write_u16(&mut buf, value);
        self.store_checked(addr, &buf)
    }

    pub fn store_word(&mut self, addr: u32, value: u32) -> Result<(), SimulationFault> {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        self.store_checked(addr, &buf)
    }

    /// Bypasses all protection checks and cache notification. Used only by
    /// the linker's loader path to place the initial image.
    pub fn store_byte_privileged(&mut self, addr: u32, value: u8) {
        self.bytes.insert(addr, value);
    }

    pub fn store_word_privileged(&mut self, addr: u32, value: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, value);
        for (i, b) in buf.iter().enumerate() {
            self.bytes.insert(addr.wrapping_add(i as u32), *b);
        }
    }

    pub fn load_word_privileged(&self, addr: u32) -> u32 {
        let mut buf = [0u8; 4];
        for i in 0..4u32 {
            buf[i as usize] = self.read_raw(addr.wrapping_add(i));
        }
        LittleEndian::read_u32(&buf)
    }

    /// Instruction fetch: checked against the reserved bands like any other
    /// read, but bypasses the cache — cache accounting is about data
    /// accesses made by load/store executors, not the fetch itself.
    pub fn fetch_word(&self, addr: u32) -> Result<u32, SimulationFault> {
        if addr <= RESERVED_LOW_END || addr >= RESERVED_HIGH_BEGIN {
            return Err(SimulationFault::invalid_address(addr, true));
        }
        Ok(self.load_word_privileged(addr))
    }

    pub fn is_text_writable(&self, addr: u32) -> bool {
        self.self_modifying || self.segments.text_writable(addr)
    }

    pub fn block_states(&self) -> Vec<BlockState> {
        self.cache.block_states()
    }

    pub fn reset_cache(&mut self) {
        self.cache.reset();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn memory() -> Memory {
        let segments = Segments {
            text_begin: TEXT_BEGIN,
            text_end: TEXT_BEGIN + 0x1000,
            rodata_begin: 0x1000_0000,
            rodata_end: 0x1000_0100,
            heap_base: 0x1000_1000,
        };
        Memory::new(segments, CacheConfig::default()).unwrap()
    }

    #[test]
    fn rejects_write_to_text() {
        let mut mem = memory();
        assert!(mem.store_byte(TEXT_BEGIN, 1).is_err());
    }

    #[test]
    fn rejects_write_to_rodata() {
        let mut mem = memory();
        assert!(mem.store_byte(0x1000_0010, 1).is_err());
        assert!(mem.load_byte(0x1000_0010).is_ok());
    }

    #[test]
    fn self_modifying_allows_text_write() {
        let mut mem = memory();
        mem.set_self_modifying(true);
        assert!(mem.store_byte(TEXT_BEGIN, 1).is_ok());
    }

    #[test]
    fn word_round_trips_little_endian() {
        let mut mem = memory();
        mem.store_word(0x1000_2000, 0xDEAD_BEEF).unwrap();
        assert_eq!(mem.load_word(0x1000_2000).unwrap(), 0xDEAD_BEEF);
        assert_eq!(mem.load_byte(0x1000_2000).unwrap(), 0xEF);
    }

    #[test]
    fn reserved_bands_always_fail() {
        let mut mem = memory();
        assert!(mem.load_byte(0x100).is_err());
        assert!(mem.load_byte(0xFFFF_0000).is_err());
    }
}
