//! Abstract change-sink interface. The core never observes a GUI, table
//! widget or property-change bus directly; it emits typed events to
//! whatever sink the host supplies, or none at all.

use crate::cache::BlockState;
use crate::register::RegisterFile;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChangeEvent {
    RegisterChanged {
        file: RegisterFile,
        index: usize,
        new_value: u32,
    },
    MemoryChanged {
        addr: u32,
        new_value: u8,
    },
    CacheBlockStateChanged {
        index: usize,
        state: BlockState,
    },
}

/// Implemented by hosts (a GUI, a CLI, a test harness) that want to observe
/// state changes as they happen. The core holds at most one sink and never
/// requires one to function.
pub trait ChangeSink {
    fn on_change(&mut self, event: ChangeEvent);
}

/// A sink that discards every event; the default when a host supplies none.
#[derive(Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn on_change(&mut self, _event: ChangeEvent) {}
}
