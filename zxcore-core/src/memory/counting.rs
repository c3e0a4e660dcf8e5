/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A debug-mode memory wrapper that attributes every read, write and instruction fetch to
//! the Z80 address, the physical address and the owning page it touched.
//!
//! This is entirely new code - the teacher crate exposes [super::ZxMemory] as a single fast
//! interface with no counting layer at all. [CountingMemory] is built as a transparent
//! wrapper around any `M: ZxMemory` rather than baked into each concrete memory type, so the
//! hot path (`M` used directly, without this wrapper) pays no overhead when debugging is off -
//! matching the "two memory interfaces chosen once per run segment, never per access" contract.
//!
//! [ZxMemory::read] takes `&self`, so the per-address/per-bank tallies live behind [Cell]s
//! rather than needing `&mut self` on every fetch; [ZxMemory::write] already takes `&mut self`
//! and could update them directly, but going through the same `record` helper keeps one code
//! path for both.
use core::cell::Cell;
use std::io::Read;

use bitflags::bitflags;

use super::{
    ExRom, MemPageOffset, MemoryKind, Result, ScreenArray, ZxMemory,
};

bitflags! {
    /// Which kinds of access have touched a byte or a page.
    #[derive(Default)]
    pub struct AccessKind: u8 {
        const READ  = 0b001;
        const WRITE = 0b010;
        const EXEC  = 0b100;
    }
}

/// Read/write/execute tallies for a single byte or page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessCounts {
    pub reads: u64,
    pub writes: u64,
    pub execs: u64,
}

impl AccessCounts {
    #[inline]
    fn bump(&mut self, kind: AccessKind) {
        if kind.contains(AccessKind::READ) { self.reads += 1; }
        if kind.contains(AccessKind::WRITE) { self.writes += 1; }
        if kind.contains(AccessKind::EXEC) { self.execs += 1; }
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.reads + self.writes + self.execs
    }
}

impl core::ops::Add for AccessCounts {
    type Output = AccessCounts;
    fn add(self, rhs: AccessCounts) -> AccessCounts {
        AccessCounts {
            reads: self.reads + rhs.reads,
            writes: self.writes + rhs.writes,
            execs: self.execs + rhs.execs,
        }
    }
}

impl core::ops::AddAssign for AccessCounts {
    fn add_assign(&mut self, rhs: AccessCounts) {
        *self = *self + rhs;
    }
}

/// The $4000..=$5AFF screen bitmap+attribute range, excluded by the "screen-excluded" counter
/// variants so the debugger doesn't drown genuine program activity in per-frame video traffic.
pub const SCREEN_EXCLUDE_RANGE: core::ops::RangeInclusive<u16> = 0x4000..=0x5AFF;

/// Per-Z80-address, per-physical-address and per-page access counters layered on top of a
/// [ZxMemory] implementation.
///
/// Construct with [CountingMemory::new] and access the wrapped memory via [CountingMemory::inner]
/// / [CountingMemory::inner_mut], or transparently through the [ZxMemory] impl this type provides.
pub struct CountingMemory<M> {
    inner: M,
    /// Indexed by Z80 address (0..=0xFFFF).
    by_address: Vec<Cell<AccessCounts>>,
    /// Indexed by offset into the physical memory arena ([ZxMemory::mem_ref]).
    by_physical: Vec<Cell<AccessCounts>>,
    /// One entry per physical page ([ZxMemory::PAGES_MAX] + 1), aggregated from `by_physical`.
    banks_accessed: Vec<Cell<AccessKind>>,
}

impl<M: Clone> Clone for CountingMemory<M> {
    fn clone(&self) -> Self {
        CountingMemory {
            inner: self.inner.clone(),
            by_address: self.by_address.iter().map(|c| Cell::new(c.get())).collect(),
            by_physical: self.by_physical.iter().map(|c| Cell::new(c.get())).collect(),
            banks_accessed: self.banks_accessed.iter().map(|c| Cell::new(c.get())).collect(),
        }
    }
}

impl<M: ZxMemory> CountingMemory<M> {
    pub fn new(inner: M) -> Self {
        let phys_len = inner.mem_ref().len();
        CountingMemory {
            inner,
            by_address: (0..=u16::MAX).map(|_| Cell::new(AccessCounts::default())).collect(),
            by_physical: (0..phys_len).map(|_| Cell::new(AccessCounts::default())).collect(),
            banks_accessed: (0..=M::PAGES_MAX as usize).map(|_| Cell::new(AccessKind::empty())).collect(),
        }
    }

    #[inline]
    pub fn inner(&self) -> &M { &self.inner }
    #[inline]
    pub fn inner_mut(&mut self) -> &mut M { &mut self.inner }
    #[inline]
    pub fn into_inner(self) -> M { self.inner }

    /// Clears all counters without resetting the underlying memory contents.
    pub fn clear_counters(&mut self) {
        for c in self.by_address.iter() { c.set(AccessCounts::default()); }
        for c in self.by_physical.iter() { c.set(AccessCounts::default()); }
        for b in self.banks_accessed.iter() { b.set(AccessKind::empty()); }
    }

    #[inline]
    pub fn address_counts(&self, addr: u16) -> AccessCounts {
        self.by_address[addr as usize].get()
    }

    /// Access counts attributed to the physical byte currently backing `addr`, if mapped.
    pub fn physical_counts_at(&self, addr: u16) -> Option<AccessCounts> {
        let off = self.inner.page_index_at(addr).ok()?;
        self.physical_offset_of(off).map(|p| self.by_physical[p].get())
    }

    fn physical_offset_of(&self, off: MemPageOffset) -> Option<usize> {
        // Mirrors ZxMemory's own default rom_ref/ram_ref split: ROM banks occupy
        // mem_ref()[0..ROM_SIZE], RAM banks occupy mem_ref()[ROM_SIZE..], each PAGE_SIZE wide.
        let page_size = M::PAGE_SIZE;
        let base = match off.kind {
            MemoryKind::Rom => 0,
            MemoryKind::Ram => M::ROM_SIZE,
        };
        let offset = base + off.index as usize * page_size + off.offset as usize;
        if offset < self.by_physical.len() { Some(offset) } else { None }
    }

    /// Total counts for every byte belonging to physical `page`, optionally excluding the
    /// $4000..=$5AFF screen range (only meaningful for `page == 1`, the common screen window).
    pub fn page_counts(&self, page: u8, exclude_screen: bool) -> Result<AccessCounts> {
        let kind = self.inner.page_kind(page)?;
        let page_size = M::PAGE_SIZE;
        let base = match kind {
            MemoryKind::Rom => 0,
            MemoryKind::Ram => M::ROM_SIZE,
        };
        let start = base + page as usize * page_size;
        let mut total = AccessCounts::default();
        for (i, c) in self.by_physical[start..start + page_size].iter().enumerate() {
            if exclude_screen {
                let z80_addr = (page as u16).wrapping_mul(0x4000).wrapping_add(i as u16);
                if SCREEN_EXCLUDE_RANGE.contains(&z80_addr) {
                    continue;
                }
            }
            total += c.get();
        }
        Ok(total)
    }

    /// The OR of every access kind observed anywhere on physical `page`.
    pub fn bank_accessed(&self, page: u8) -> AccessKind {
        self.banks_accessed.get(page as usize).map(|c| c.get()).unwrap_or_else(AccessKind::empty)
    }

    #[inline]
    fn record(&self, addr: u16, kind: AccessKind) {
        let cell = &self.by_address[addr as usize];
        let mut c = cell.get();
        c.bump(kind);
        cell.set(c);
        if let Ok(off) = self.inner.page_index_at(addr) {
            if let Some(p) = self.physical_offset_of(off) {
                if let Some(cell) = self.by_physical.get(p) {
                    let mut c = cell.get();
                    c.bump(kind);
                    cell.set(c);
                }
            }
            if let Some(b) = self.banks_accessed.get(off.index as usize) {
                b.set(b.get() | kind);
            }
        }
    }

    /// Records an instruction fetch (M1 cycle) at `addr` without performing the read itself;
    /// the CPU glue calls this once per opcode byte fetched, in addition to the ordinary
    /// [ZxMemory::read] the fetch also performs.
    pub fn record_exec(&self, addr: u16) {
        self.record(addr, AccessKind::EXEC);
    }
}

impl<M: ZxMemory> ZxMemory for CountingMemory<M> {
    const PAGE_SIZE: usize = M::PAGE_SIZE;
    const ROM_SIZE: usize = M::ROM_SIZE;
    const RAMTOP: u16 = M::RAMTOP;
    const PAGES_MAX: u8 = M::PAGES_MAX;
    const SCR_BANKS_MAX: usize = M::SCR_BANKS_MAX;
    const ROM_BANKS_MAX: usize = M::ROM_BANKS_MAX;
    const RAM_BANKS_MAX: usize = M::RAM_BANKS_MAX;

    fn reset(&mut self) {
        self.inner.reset();
        self.clear_counters();
    }

    fn read(&self, addr: u16) -> u8 {
        self.record(addr, AccessKind::READ);
        self.inner.read(addr)
    }

    fn read16(&self, addr: u16) -> u16 {
        self.record(addr, AccessKind::READ);
        self.record(addr.wrapping_add(1), AccessKind::READ);
        self.inner.read16(addr)
    }

    fn read_screen(&self, screen_bank: usize, addr: u16) -> u8 {
        self.inner.read_screen(screen_bank, addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.inner.write(addr, val);
        self.record(addr, AccessKind::WRITE);
    }

    fn write16(&mut self, addr: u16, val: u16) {
        self.inner.write16(addr, val);
        self.record(addr, AccessKind::WRITE);
        self.record(addr.wrapping_add(1), AccessKind::WRITE);
    }

    fn mem_ref(&self) -> &[u8] { self.inner.mem_ref() }
    fn mem_mut(&mut self) -> &mut [u8] { self.inner.mem_mut() }

    fn screen_ref(&self, screen_bank: usize) -> Result<&ScreenArray> {
        self.inner.screen_ref(screen_bank)
    }
    fn screen_mut(&mut self, screen_bank: usize) -> Result<&mut ScreenArray> {
        self.inner.screen_mut(screen_bank)
    }

    fn page_kind(&self, page: u8) -> Result<MemoryKind> { self.inner.page_kind(page) }
    fn page_bank(&self, page: u8) -> Result<(MemoryKind, usize)> { self.inner.page_bank(page) }
    fn page_ref(&self, page: u8) -> Result<&[u8]> { self.inner.page_ref(page) }
    fn page_mut(&mut self, page: u8) -> Result<&mut [u8]> { self.inner.page_mut(page) }

    fn rom_bank_ref(&self, rom_bank: usize) -> Result<&[u8]> { self.inner.rom_bank_ref(rom_bank) }
    fn rom_bank_mut(&mut self, rom_bank: usize) -> Result<&mut [u8]> { self.inner.rom_bank_mut(rom_bank) }
    fn ram_bank_ref(&self, ram_bank: usize) -> Result<&[u8]> { self.inner.ram_bank_ref(ram_bank) }
    fn ram_bank_mut(&mut self, ram_bank: usize) -> Result<&mut [u8]> { self.inner.ram_bank_mut(ram_bank) }

    fn map_rom_bank(&mut self, rom_bank: usize, page: u8) -> Result<()> {
        self.inner.map_rom_bank(rom_bank, page)
    }
    fn map_exrom(&mut self, exrom_bank: ExRom, page: u8) -> Result<()> {
        self.inner.map_exrom(exrom_bank, page)
    }
    fn unmap_exrom(&mut self, exrom_bank: &ExRom) { self.inner.unmap_exrom(exrom_bank) }
    fn is_exrom_at(&mut self, page: u8) -> bool { self.inner.is_exrom_at(page) }
    fn has_mapped_exrom(&mut self, exrom_bank: &ExRom) -> bool { self.inner.has_mapped_exrom(exrom_bank) }
    fn map_ram_bank(&mut self, ram_bank: usize, page: u8) -> Result<()> {
        self.inner.map_ram_bank(ram_bank, page)
    }

    fn load_into_rom<R: Read>(&mut self, rd: R) -> Result<()> {
        self.inner.load_into_rom(rd)
    }
    fn load_into_rom_bank<R: Read>(&mut self, rom_bank: usize, rd: R) -> Result<()> {
        self.inner.load_into_rom_bank(rom_bank, rd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKind as MK;

    #[derive(Default, Clone)]
    struct FlatMem(Vec<u8>);

    impl ZxMemory for FlatMem {
        const ROM_SIZE: usize = 0x4000;
        const RAMTOP: u16 = 0xFFFF;
        const PAGES_MAX: u8 = 3;
        const SCR_BANKS_MAX: usize = 0;
        const ROM_BANKS_MAX: usize = 0;
        const RAM_BANKS_MAX: usize = 0;

        fn reset(&mut self) { self.0.iter_mut().for_each(|b| *b = 0) }
        fn read(&self, addr: u16) -> u8 { self.0[addr as usize] }
        fn read16(&self, addr: u16) -> u16 {
            u16::from_le_bytes([self.0[addr as usize], self.0[addr.wrapping_add(1) as usize]])
        }
        fn read_screen(&self, _b: usize, addr: u16) -> u8 { self.0[addr as usize] }
        fn write(&mut self, addr: u16, val: u8) { self.0[addr as usize] = val; }
        fn write16(&mut self, addr: u16, val: u16) {
            let [lo, hi] = val.to_le_bytes();
            self.0[addr as usize] = lo;
            self.0[addr.wrapping_add(1) as usize] = hi;
        }
        fn mem_ref(&self) -> &[u8] { &self.0 }
        fn mem_mut(&mut self) -> &mut [u8] { &mut self.0 }
        fn screen_ref(&self, _b: usize) -> Result<&ScreenArray> { unimplemented!() }
        fn screen_mut(&mut self, _b: usize) -> Result<&mut ScreenArray> { unimplemented!() }
        fn page_kind(&self, page: u8) -> Result<MemoryKind> {
            Ok(if page == 0 { MK::Rom } else { MK::Ram })
        }
        fn page_bank(&self, page: u8) -> Result<(MemoryKind, usize)> {
            Ok((self.page_kind(page)?, 0))
        }
        fn page_ref(&self, page: u8) -> Result<&[u8]> {
            let s = page as usize * 0x4000;
            Ok(&self.0[s..s + 0x4000])
        }
        fn page_mut(&mut self, page: u8) -> Result<&mut [u8]> {
            let s = page as usize * 0x4000;
            Ok(&mut self.0[s..s + 0x4000])
        }
        fn rom_bank_ref(&self, _b: usize) -> Result<&[u8]> { Ok(&self.0[0..0x4000]) }
        fn rom_bank_mut(&mut self, _b: usize) -> Result<&mut [u8]> { Ok(&mut self.0[0..0x4000]) }
        fn ram_bank_ref(&self, _b: usize) -> Result<&[u8]> { Ok(&self.0[0x4000..]) }
        fn ram_bank_mut(&mut self, _b: usize) -> Result<&mut [u8]> { Ok(&mut self.0[0x4000..]) }
        fn map_rom_bank(&mut self, _b: usize, _p: u8) -> Result<()> { Ok(()) }
        fn map_ram_bank(&mut self, _b: usize, _p: u8) -> Result<()> { Ok(()) }
    }

    fn new_mem() -> CountingMemory<FlatMem> {
        CountingMemory::new(FlatMem(vec![0u8; 0x10000]))
    }

    #[test]
    fn read_and_write_bump_distinct_counters() {
        let mut mem = new_mem();
        mem.write(0x8000, 42);
        let _ = mem.read(0x8000);
        let _ = mem.read(0x8000);
        let c = mem.address_counts(0x8000);
        assert_eq!(c.writes, 1);
        assert_eq!(c.reads, 2);
    }

    #[test]
    fn exec_is_recorded_explicitly() {
        let mem = new_mem();
        mem.record_exec(0x0000);
        mem.record_exec(0x0000);
        assert_eq!(mem.address_counts(0x0000).execs, 2);
    }

    #[test]
    fn per_bank_totals_equal_sum_of_per_address_counters() {
        let mut mem = new_mem();
        for addr in 0x4000..0x4010u16 {
            mem.write(addr, 1);
        }
        let page_total = mem.page_counts(1, false).unwrap();
        let manual: u64 = (0x4000..0x4010u16).map(|a| mem.address_counts(a).writes).sum();
        assert_eq!(page_total.writes, manual);
    }

    #[test]
    fn screen_excluded_variant_drops_screen_range() {
        let mut mem = new_mem();
        mem.write(0x4000, 1); // inside screen range, page 1
        mem.write(0x5B10, 1); // outside 0x4000..=0x5AFF, still page 1
        let excluded = mem.page_counts(1, true).unwrap();
        let full = mem.page_counts(1, false).unwrap();
        assert_eq!(full.writes, 2);
        assert_eq!(excluded.writes, 1);
    }

    #[test]
    fn bank_accessed_reflects_access_kind() {
        let mut mem = new_mem();
        mem.write(0x8000, 5);
        assert!(mem.bank_accessed(2).contains(AccessKind::WRITE));
        assert!(!mem.bank_accessed(2).contains(AccessKind::READ));
    }
}
