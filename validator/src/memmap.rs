//! Linux `/proc/<pid>/maps` reader, the concrete
//! [`validator_core::memmap::MemoryMapProvider`] the master loop wires into
//! [`validator_core::ValidatorEngine`].

use std::fs;

use validator_core::memmap::{MemoryMapProvider, MemoryRange};

pub struct ProcMaps;

impl MemoryMapProvider for ProcMaps {
    fn maps(&self, pid: i32) -> Vec<MemoryRange> {
        let Ok(contents) = fs::read_to_string(format!("/proc/{pid}/maps")) else {
            return Vec::new();
        };
        contents
            .lines()
            .filter_map(|line| {
                let bounds = line.split_whitespace().next()?;
                let (start, end) = bounds.split_once('-')?;
                let start = u64::from_str_radix(start, 16).ok()?;
                let end = u64::from_str_radix(end, 16).ok()?;
                Some(MemoryRange { start, end })
            })
            .collect()
    }
}
