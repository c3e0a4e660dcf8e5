/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Breakpoints and call-flow tracing.
//!
//! Entirely new: the teacher ships no debugger of its own, only the [crate::chip::ControlUnit]
//! hook ([crate::chip::ControlUnit::execute_single_step] takes an `Option<F: FnOnce(CpuDebug)>`)
//! that a debugger can be built on. [BreakpointSet] and [CallTraceLog] are the pieces driven
//! through that hook; [crate::memory::CountingMemory] covers the separate memory-access side
//! of debugging.
use std::collections::HashMap;

use crate::memory::MemoryKind;

/// What kind of memory or port access a [Breakpoint] triggers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointKind {
    Exec,
    MemRead,
    MemWrite,
    IoRead,
    IoWrite,
}

/// Where a [Breakpoint] is anchored: a fixed Z80 address regardless of what's paged in there,
/// or a specific physical bank/offset that stays armed across paging changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakpointScope {
    Z80Address(u16),
    Physical { kind: MemoryKind, bank: usize, offset: u16 },
}

/// Opaque handle returned by [BreakpointSet::add], used to look up, disable or remove the
/// breakpoint later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(u32);

#[derive(Debug, Clone, Copy)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub kind: BreakpointKind,
    pub scope: BreakpointScope,
    pub active: bool,
}

/// A collection of armed breakpoints, indexed for fast lookup from the hot execution path.
#[derive(Default)]
pub struct BreakpointSet {
    next_id: u32,
    breakpoints: HashMap<BreakpointId, Breakpoint>,
    by_z80_addr: HashMap<u16, Vec<BreakpointId>>,
    by_physical: HashMap<(MemoryKind, usize, u16), Vec<BreakpointId>>,
    by_port: HashMap<u16, Vec<BreakpointId>>,
}

impl BreakpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: BreakpointKind, scope: BreakpointScope) -> BreakpointId {
        let id = BreakpointId(self.next_id);
        self.next_id += 1;
        let bp = Breakpoint { id, kind, scope, active: true };
        match (kind, scope) {
            (BreakpointKind::IoRead | BreakpointKind::IoWrite, BreakpointScope::Z80Address(port)) => {
                self.by_port.entry(port).or_default().push(id);
            }
            (_, BreakpointScope::Z80Address(addr)) => {
                self.by_z80_addr.entry(addr).or_default().push(id);
            }
            (_, BreakpointScope::Physical { kind: mk, bank, offset }) => {
                self.by_physical.entry((mk, bank, offset)).or_default().push(id);
            }
        }
        self.breakpoints.insert(id, bp);
        id
    }

    pub fn remove(&mut self, id: BreakpointId) -> bool {
        match self.breakpoints.remove(&id) {
            Some(bp) => {
                let index = match bp.scope {
                    BreakpointScope::Z80Address(addr) if bp.kind == BreakpointKind::IoRead || bp.kind == BreakpointKind::IoWrite =>
                        self.by_port.get_mut(&addr),
                    BreakpointScope::Z80Address(addr) => self.by_z80_addr.get_mut(&addr),
                    BreakpointScope::Physical { kind, bank, offset } =>
                        self.by_physical.get_mut(&(kind, bank, offset)),
                };
                if let Some(ids) = index {
                    ids.retain(|&x| x != id);
                }
                true
            }
            None => false,
        }
    }

    pub fn set_active(&mut self, id: BreakpointId, active: bool) -> bool {
        match self.breakpoints.get_mut(&id) {
            Some(bp) => { bp.active = active; true }
            None => false,
        }
    }

    pub fn get(&self, id: BreakpointId) -> Option<&Breakpoint> {
        self.breakpoints.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.values()
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    fn first_active(&self, ids: &[BreakpointId], kind: BreakpointKind) -> Option<BreakpointId> {
        ids.iter().copied().find(|id| {
            self.breakpoints.get(id).map_or(false, |bp| bp.active && bp.kind == kind)
        })
    }

    /// Call when the CPU is about to fetch the opcode at `addr`. `physical` is the bank/offset
    /// currently paged in at `addr`, when known, so bank-anchored breakpoints still fire
    /// regardless of which Z80 address the bank happens to be mapped to.
    pub fn handle_exec(&self, addr: u16, physical: Option<(MemoryKind, usize, u16)>) -> Option<BreakpointId> {
        self.handle(addr, physical, BreakpointKind::Exec)
    }

    pub fn handle_mem_read(&self, addr: u16, physical: Option<(MemoryKind, usize, u16)>) -> Option<BreakpointId> {
        self.handle(addr, physical, BreakpointKind::MemRead)
    }

    pub fn handle_mem_write(&self, addr: u16, physical: Option<(MemoryKind, usize, u16)>) -> Option<BreakpointId> {
        self.handle(addr, physical, BreakpointKind::MemWrite)
    }

    fn handle(&self, addr: u16, physical: Option<(MemoryKind, usize, u16)>, kind: BreakpointKind) -> Option<BreakpointId> {
        if let Some(ids) = self.by_z80_addr.get(&addr) {
            if let Some(id) = self.first_active(ids, kind) {
                return Some(id);
            }
        }
        if let Some(phys) = physical {
            if let Some(ids) = self.by_physical.get(&phys) {
                if let Some(id) = self.first_active(ids, kind) {
                    return Some(id);
                }
            }
        }
        None
    }

    pub fn handle_io_read(&self, port: u16) -> Option<BreakpointId> {
        self.by_port.get(&port).and_then(|ids| self.first_active(ids, BreakpointKind::IoRead))
    }

    pub fn handle_io_write(&self, port: u16) -> Option<BreakpointId> {
        self.by_port.get(&port).and_then(|ids| self.first_active(ids, BreakpointKind::IoWrite))
    }
}

/// The class of control-flow instruction a call-trace entry was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlFlowKind {
    Jp,
    Jr,
    Djnz,
    Call,
    Ret,
    Rst,
    Reti,
    Retn,
}

/// Classifies the control-flow instruction encoded by `code` (as given by
/// `z80emu::CpuDebug::code`), if any. Conditional branches (`JP cc`, `JR cc`, `CALL cc`,
/// `RET cc`) classify the same as their unconditional counterparts; whether the branch was
/// actually taken is determined by the caller comparing the resulting PC to the fall-through
/// address, not by this function.
pub fn classify_opcode(code: &[u8]) -> Option<ControlFlowKind> {
    let op = *code.first()?;
    use ControlFlowKind::*;
    match op {
        0xC3 | 0xE9 => Some(Jp), // JP nn / JP (HL)/(IX)/(IY)
        0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => Some(Jp), // JP cc,nn
        0x18 => Some(Jr), // JR e
        0x20 | 0x28 | 0x30 | 0x38 => Some(Jr), // JR cc,e
        0x10 => Some(Djnz),
        0xCD => Some(Call), // CALL nn
        0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => Some(Call), // CALL cc,nn
        0xC9 => Some(Ret),
        0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => Some(Ret), // RET cc
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => Some(Rst),
        0xED if code.len() >= 2 => match code[1] {
            0x4D => Some(Reti),
            0x45 | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => Some(Retn),
            _ => None,
        },
        _ => None,
    }
}

/// Tally for a single observed (source, target) control-flow edge.
#[derive(Debug, Clone, Copy)]
pub struct CallTraceEntry {
    pub kind: ControlFlowKind,
    pub hits: u64,
}

/// A histogram of control-flow edges taken during execution, keyed both by source ("what kind
/// of jump lives at this address, and how often is it taken") and by target ("how often has
/// execution arrived at this address from somewhere else") - useful for reconstructing a call
/// graph or flagging hot entry points without a full disassembly pass.
#[derive(Default)]
pub struct CallTraceLog {
    edges: HashMap<(u16, u16), CallTraceEntry>,
    by_source: HashMap<u16, ControlFlowKind>,
    by_target: HashMap<u16, u64>,
}

impl CallTraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observes the instruction encoded by `code`, fetched from `source_pc`, after execution
    /// left the CPU's program counter at `new_pc`. Returns the classified kind if this was a
    /// control-flow instruction whose branch was actually taken (`new_pc` differs from the
    /// natural fall-through address); does nothing and returns `None` otherwise.
    pub fn observe(&mut self, source_pc: u16, code: &[u8], new_pc: u16) -> Option<ControlFlowKind> {
        let kind = classify_opcode(code)?;
        let fall_through = source_pc.wrapping_add(code.len() as u16);
        if new_pc == fall_through {
            return None;
        }
        let entry = self.edges.entry((source_pc, new_pc)).or_insert(CallTraceEntry { kind, hits: 0 });
        entry.hits += 1;
        self.by_source.insert(source_pc, kind);
        *self.by_target.entry(new_pc).or_insert(0) += 1;
        Some(kind)
    }

    pub fn edge_hits(&self, source_pc: u16, target_pc: u16) -> u64 {
        self.edges.get(&(source_pc, target_pc)).map_or(0, |e| e.hits)
    }

    /// The most recently observed control-flow kind issued from `source_pc`, if any.
    pub fn source_kind(&self, source_pc: u16) -> Option<ControlFlowKind> {
        self.by_source.get(&source_pc).copied()
    }

    /// How many times execution has arrived at `target_pc` via a taken branch.
    pub fn target_hits(&self, target_pc: u16) -> u64 {
        self.by_target.get(&target_pc).copied().unwrap_or(0)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&(u16, u16), &CallTraceEntry)> {
        self.edges.iter()
    }

    pub fn clear(&mut self) {
        self.edges.clear();
        self.by_source.clear();
        self.by_target.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_breakpoint_fires_only_for_its_address() {
        let mut bps = BreakpointSet::new();
        let id = bps.add(BreakpointKind::Exec, BreakpointScope::Z80Address(0x8000));
        assert_eq!(bps.handle_exec(0x8000, None), Some(id));
        assert_eq!(bps.handle_exec(0x8001, None), None);
        assert_eq!(bps.handle_mem_read(0x8000, None), None, "exec breakpoint must not match reads");
    }

    #[test]
    fn disabling_a_breakpoint_suppresses_it() {
        let mut bps = BreakpointSet::new();
        let id = bps.add(BreakpointKind::MemWrite, BreakpointScope::Z80Address(0x4000));
        assert!(bps.set_active(id, false));
        assert_eq!(bps.handle_mem_write(0x4000, None), None);
        assert!(bps.set_active(id, true));
        assert_eq!(bps.handle_mem_write(0x4000, None), Some(id));
    }

    #[test]
    fn physical_breakpoint_survives_paging_changes() {
        let mut bps = BreakpointSet::new();
        let phys = (MemoryKind::Ram, 5, 0x10);
        let id = bps.add(BreakpointKind::Exec, BreakpointScope::Physical { kind: phys.0, bank: phys.1, offset: phys.2 });
        // Same bank mapped at a different Z80 address still triggers.
        assert_eq!(bps.handle_exec(0xC000, Some(phys)), Some(id));
        assert_eq!(bps.handle_exec(0x8000, Some(phys)), Some(id));
        assert_eq!(bps.handle_exec(0x8000, None), None);
    }

    #[test]
    fn removed_breakpoint_no_longer_matches() {
        let mut bps = BreakpointSet::new();
        let id = bps.add(BreakpointKind::IoWrite, BreakpointScope::Z80Address(0xFE));
        assert!(bps.remove(id));
        assert_eq!(bps.handle_io_write(0xFE), None);
    }

    #[test]
    fn classifies_common_opcodes() {
        assert_eq!(classify_opcode(&[0xC3, 0x00, 0x80]), Some(ControlFlowKind::Jp));
        assert_eq!(classify_opcode(&[0xCD, 0x00, 0x80]), Some(ControlFlowKind::Call));
        assert_eq!(classify_opcode(&[0xC9]), Some(ControlFlowKind::Ret));
        assert_eq!(classify_opcode(&[0x18, 0x10]), Some(ControlFlowKind::Jr));
        assert_eq!(classify_opcode(&[0x10, 0xFE]), Some(ControlFlowKind::Djnz));
        assert_eq!(classify_opcode(&[0xFF]), Some(ControlFlowKind::Rst));
        assert_eq!(classify_opcode(&[0xED, 0x4D]), Some(ControlFlowKind::Reti));
        assert_eq!(classify_opcode(&[0xED, 0x45]), Some(ControlFlowKind::Retn));
        assert_eq!(classify_opcode(&[0x00]), None, "NOP is not a control-flow opcode");
    }

    #[test]
    fn call_trace_ignores_untaken_conditional_branches() {
        let mut log = CallTraceLog::new();
        // JR Z,e at 0x8000, two bytes long; if not taken PC lands on the fall-through 0x8002.
        assert_eq!(log.observe(0x8000, &[0x28, 0x10], 0x8002), None);
        assert_eq!(log.edge_hits(0x8000, 0x8002), 0);
    }

    #[test]
    fn call_trace_records_taken_branches_and_hit_counts() {
        let mut log = CallTraceLog::new();
        log.observe(0x8000, &[0xCD, 0x00, 0x90], 0x9000);
        log.observe(0x8000, &[0xCD, 0x00, 0x90], 0x9000);
        assert_eq!(log.edge_hits(0x8000, 0x9000), 2);
        assert_eq!(log.target_hits(0x9000), 2);
        assert_eq!(log.source_kind(0x8000), Some(ControlFlowKind::Call));
    }
}
