/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Machine configuration, concrete chipset dispatch and the single-threaded emulator context.
//!
//! [EmulatorContext] is the synchronous engine: it owns one concrete [Chipset] together with
//! the CPU, keyboard, tape deck and debugger state, and exposes the Control and Debug APIs as
//! plain methods. [crate::scheduler] wraps it to run on a dedicated thread.
use core::fmt;
use std::io;

use crate::audio::ay::AyAmps;
use crate::audio::{AmpLevels, AudioFrame, Blep, EarInAudioFrame, EarMicOutAudioFrame, EarInAmps2, EarMicAmps4};
use crate::audio::ay::AyAudioFrame;
use crate::bus::ay::Ay3_891xMelodik;
use crate::bus::fdc::FdcBusDevice;
use crate::bus::VFNullDevice;
use crate::chip::ula::{UlaPAL, UlaVideoFrame};
use crate::chip::ula128::{Ula128, Ula128VidFrame};
use crate::chip::{ControlUnit, EarIn, HostConfig, MemoryAccess};
use crate::clock::FTs;
use crate::debug::{BreakpointId, BreakpointKind, BreakpointScope, BreakpointSet, CallTraceLog};
use crate::formats::tapedeck::TapeDeck;
use crate::keyboard::{ExtendedKey, KeyboardMatrix};
use crate::memory::{Memory48k, ZxMemory, ZxMemoryError};
use crate::peripherals::KeyboardInterface;
use crate::video::{BorderSize, Video};
use crate::video::pixel::{PixelBufA32, SpectrumPalRGBA32};
use crate::z80emu::{Cpu, Z80NMOS};

/// An emulated host model. Not every [Model] maps onto its own chipset: `Pentagon` and
/// `Scorpion` run on the same 128k chipset shape as `Zx128` (see `DESIGN.md`); the rest are
/// rejected by [MachineConfig::validate] until their own chipset is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Model {
    Zx48,
    Zx128,
    Pentagon,
    Scorpion,
    Profi,
    Atm,
    TsConf,
    Phoenix,
}

impl Model {
    /// `true` if this model currently has a matching [Chipset] variant to run on.
    pub fn is_supported(self) -> bool {
        matches!(self, Model::Zx48 | Model::Zx128 | Model::Pentagon | Model::Scorpion)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            Model::Zx48 => "ZX Spectrum 48k",
            Model::Zx128 => "ZX Spectrum 128k",
            Model::Pentagon => "Pentagon 128",
            Model::Scorpion => "Scorpion ZS-256",
            Model::Profi => "Profi",
            Model::Atm => "ATM Turbo",
            Model::TsConf => "TS-Conf",
            Model::Phoenix => "Phoenix",
        })
    }
}

/// A single ROM image to be loaded into a contiguous 16k ROM bank at machine init.
#[derive(Clone)]
pub struct RomBank {
    pub bank: usize,
    pub data: Vec<u8>,
}

/// Declarative machine configuration consumed by [EmulatorContext::init].
#[derive(Clone)]
pub struct MachineConfig {
    pub model: Model,
    pub rom_set: Vec<RomBank>,
    pub trdos_enabled: bool,
    pub late_timings: bool,
    pub issue3_keyboard: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            model: Model::Zx48,
            rom_set: Vec::new(),
            trdos_enabled: false,
            late_timings: false,
            issue3_keyboard: true,
        }
    }
}

/// Errors returned while validating a [MachineConfig] or assembling an [EmulatorContext].
#[non_exhaustive]
#[derive(Debug)]
pub enum ConfigError {
    UnsupportedModel(Model),
    InvalidRomBank(usize),
    Memory(ZxMemoryError),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnsupportedModel(model) => write!(f, "model not yet supported: {}", model),
            ConfigError::InvalidRomBank(bank) => write!(f, "ROM bank index out of range: {}", bank),
            ConfigError::Memory(err) => err.fmt(f),
        }
    }
}

impl From<ZxMemoryError> for ConfigError {
    fn from(err: ZxMemoryError) -> Self {
        ConfigError::Memory(err)
    }
}

/// Errors returned while loading an external media image (snapshot, tape, disk).
#[non_exhaustive]
#[derive(Debug)]
pub enum ImageFormatError {
    UnrecognizedFormat,
    Truncated,
    Io(io::Error),
}

impl std::error::Error for ImageFormatError {}

impl fmt::Display for ImageFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageFormatError::UnrecognizedFormat => write!(f, "unrecognized image format"),
            ImageFormatError::Truncated => write!(f, "image data is truncated"),
            ImageFormatError::Io(err) => err.fmt(f),
        }
    }
}

impl From<io::Error> for ImageFormatError {
    fn from(err: io::Error) -> Self {
        ImageFormatError::Io(err)
    }
}

/// Errors returned by the Control API (`reset`, `step_*`, `run_n_cycles`).
#[non_exhaustive]
#[derive(Debug)]
pub enum ControlError {
    /// A single step failed because the CPU was left in a mid-prefix state by a prior fault.
    CpuFault,
}

impl std::error::Error for ControlError {}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::CpuFault => write!(f, "CPU execution faulted mid-instruction"),
        }
    }
}

/// Errors returned by the Debug API (direct peek/poke, breakpoint management).
#[non_exhaustive]
#[derive(Debug)]
pub enum DebugError {
    AddressOutOfRange(u16),
    UnknownBreakpoint(BreakpointId),
}

impl std::error::Error for DebugError {}

impl fmt::Display for DebugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebugError::AddressOutOfRange(addr) => write!(f, "address out of range: {:#06x}", addr),
            DebugError::UnknownBreakpoint(id) => write!(f, "unknown breakpoint: {:?}", id),
        }
    }
}

/// A flat snapshot of the Z80 register file, used by the Debug API in place of exposing the
/// `z80emu::Cpu` trait directly to front-ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
}

fn read_registers(cpu: &Z80NMOS) -> Registers {
    use crate::z80emu::{Prefix, StkReg16};
    Registers {
        af: cpu.get_reg16(StkReg16::AF),
        bc: cpu.get_reg16(StkReg16::BC),
        de: cpu.get_reg16(StkReg16::DE),
        hl: cpu.get_reg16(StkReg16::HL),
        af_alt: cpu.get_alt_reg16(StkReg16::AF),
        bc_alt: cpu.get_alt_reg16(StkReg16::BC),
        de_alt: cpu.get_alt_reg16(StkReg16::DE),
        hl_alt: cpu.get_alt_reg16(StkReg16::HL),
        ix: cpu.get_index16(Prefix::Xdd),
        iy: cpu.get_index16(Prefix::Yfd),
        sp: cpu.get_sp(),
        pc: cpu.get_pc(),
        i: cpu.get_i(),
        r: cpu.get_r(),
        iff1: cpu.get_iffs().0,
        iff2: cpu.get_iffs().1,
    }
}

fn write_registers(cpu: &mut Z80NMOS, regs: &Registers) {
    use crate::z80emu::{Prefix, StkReg16};
    cpu.set_reg16(StkReg16::AF, regs.af);
    cpu.set_reg16(StkReg16::BC, regs.bc);
    cpu.set_reg16(StkReg16::DE, regs.de);
    cpu.set_reg16(StkReg16::HL, regs.hl);
    cpu.set_index16(Prefix::Xdd, regs.ix);
    cpu.set_index16(Prefix::Yfd, regs.iy);
    cpu.set_sp(regs.sp);
    cpu.set_pc(regs.pc);
    cpu.set_i(regs.i);
    cpu.set_r(regs.r);
    cpu.set_iffs(regs.iff1, regs.iff2);
}

/// The daisy-chained bus attached to every concrete chipset: a floppy disk controller sitting
/// in front of an AY-3-8912 (Melodik-style, unconditionally decoded) sound chip.
pub type Bus<V> = FdcBusDevice<Ay3_891xMelodik<VFNullDevice<V>>>;

/// The 48k chipset assembly.
pub type Zx48Chipset = UlaPAL<Memory48k, Bus<UlaVideoFrame>>;
/// The 128k chipset assembly, also used for Pentagon/Scorpion (see [Model::is_supported]).
pub type Zx128Chipset = Ula128<Bus<Ula128VidFrame>>;

/// The concrete chipset in use, selected at [EmulatorContext::init] time from [MachineConfig].
pub enum Chipset {
    Zx48(Box<Zx48Chipset>),
    Zx128(Box<Zx128Chipset>),
}

/// Dispatches a method call common to all [UlaCommon] chipsets to the active [Chipset] variant.
macro_rules! dispatch {
    ($self:ident, $m:ident $args:tt) => {
        match $self {
            Chipset::Zx48(ula) => ula.$m $args,
            Chipset::Zx128(ula) => ula.$m $args,
        }
    };
}

impl Chipset {
    pub fn model(&self) -> Model {
        match self {
            Chipset::Zx48(_) => Model::Zx48,
            Chipset::Zx128(_) => Model::Zx128,
        }
    }

    pub fn reset(&mut self, cpu: &mut Z80NMOS, hard: bool) {
        dispatch!(self, reset(cpu, hard))
    }

    pub fn nmi(&mut self, cpu: &mut Z80NMOS) -> bool {
        dispatch!(self, nmi(cpu))
    }

    pub fn execute_next_frame(&mut self, cpu: &mut Z80NMOS) {
        dispatch!(self, execute_next_frame(cpu))
    }

    pub fn ensure_next_frame(&mut self) {
        dispatch!(self, ensure_next_frame())
    }

    pub fn is_frame_over(&self) -> bool {
        dispatch!(self, is_frame_over())
    }

    pub fn current_tstate(&self) -> FTs {
        dispatch!(self, current_tstate())
    }

    pub fn current_frame(&self) -> u64 {
        dispatch!(self, current_frame())
    }

    pub fn execute_single_step<F: FnOnce(crate::z80emu::CpuDebug)>(
        &mut self,
        cpu: &mut Z80NMOS,
        debug: Option<F>,
    ) -> Result<(), ()> {
        dispatch!(self, execute_single_step(cpu, debug))
    }

    pub fn set_key_state(&mut self, keymap: crate::peripherals::ZXKeyboardMap) {
        dispatch!(self, set_key_state(keymap))
    }

    pub fn set_ear_in(&mut self, ear_in: bool, delta_fts: u32) {
        dispatch!(self, set_ear_in(ear_in, delta_fts))
    }

    pub fn feed_ear_in(&mut self, pulse: core::num::NonZeroU32) {
        let iter = core::iter::once(pulse);
        match self {
            Chipset::Zx48(ula) => ula.feed_ear_in(iter, Some(1)),
            Chipset::Zx128(ula) => ula.feed_ear_in(iter, Some(1)),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match self {
            Chipset::Zx48(ula) => ula.memory_ref().read(addr),
            Chipset::Zx128(ula) => ula.memory_ref().read(addr),
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        match self {
            Chipset::Zx48(ula) => ula.memory_mut().write(addr, val),
            Chipset::Zx128(ula) => ula.memory_mut().write(addr, val),
        }
    }

    pub fn load_rom_bank(&mut self, bank: &RomBank) -> Result<(), ConfigError> {
        match self {
            Chipset::Zx48(ula) => {
                if bank.bank != 0 {
                    return Err(ConfigError::InvalidRomBank(bank.bank));
                }
                ula.memory_mut().load_into_rom(&bank.data[..]).map_err(ConfigError::from)
            }
            Chipset::Zx128(ula) => {
                ula.memory_mut()
                    .load_into_rom_bank(bank.bank, &bank.data[..])
                    .map_err(ConfigError::from)
            }
        }
    }

    /// Renders the last emulated frame into an RGBA8 buffer sized by [Chipset::render_size].
    pub fn render_video_frame(&mut self, buffer: &mut [u8], border_size: BorderSize) {
        let pitch = Self::render_size(border_size).0 as usize * 4;
        match self {
            Chipset::Zx48(ula) => ula.render_video_frame::<PixelBufA32, SpectrumPalRGBA32>(buffer, pitch, border_size),
            Chipset::Zx128(ula) => ula.render_video_frame::<PixelBufA32, SpectrumPalRGBA32>(buffer, pitch, border_size),
        }
    }

    pub fn render_size(border_size: BorderSize) -> (u32, u32) {
        <Zx48Chipset as Video>::render_size_pixels(border_size)
    }

    /// The host frame duration, in nanoseconds, for this chipset's CPU clock.
    pub fn frame_duration_nanos(&self) -> u32 {
        match self {
            Chipset::Zx48(_) => <Zx48Chipset as HostConfig>::frame_duration_nanos(),
            Chipset::Zx128(_) => <Zx128Chipset as HostConfig>::frame_duration_nanos(),
        }
    }

    /// The number of T-states in a single execution frame for this chipset.
    pub fn frame_tstates(&self) -> u32 {
        match self {
            Chipset::Zx48(_) => <Zx48Chipset as HostConfig>::FRAME_TSTATES as u32,
            Chipset::Zx128(_) => <Zx128Chipset as HostConfig>::FRAME_TSTATES as u32,
        }
    }

    /// Renders the EAR/MIC output and input lines, plus the AY-3-891x chip's audio, into `blep`,
    /// returning the number of samples ready to be consumed.
    ///
    /// The tape-audible path (EAR in pulses rendered alongside the EAR/MIC output) is always
    /// taken; a silent-tape toggle is a front-end concern outside this crate's scope.
    pub fn render_audio<B>(&mut self, blep: &mut B, sample_rate: u32, channel: usize) -> usize
    where
        B: Blep,
        AyAmps<B::SampleDelta>: AmpLevels<B::SampleDelta>,
        EarMicAmps4<B::SampleDelta>: AmpLevels<B::SampleDelta>,
        EarInAmps2<B::SampleDelta>: AmpLevels<B::SampleDelta>,
    {
        match self {
            Chipset::Zx48(ula) => render_chipset_audio::<_, B>(&mut **ula, blep, sample_rate, channel),
            Chipset::Zx128(ula) => render_chipset_audio::<_, B>(&mut **ula, blep, sample_rate, channel),
        }
    }
}

fn render_chipset_audio<U, B>(ula: &mut U, blep: &mut B, sample_rate: u32, channel: usize) -> usize
where
    U: AudioFrame<B> + AyAudioFrame<B> + EarMicOutAudioFrame<B> + EarInAudioFrame<B>,
    B: Blep,
    AyAmps<B::SampleDelta>: AmpLevels<B::SampleDelta>,
    EarMicAmps4<B::SampleDelta>: AmpLevels<B::SampleDelta>,
    EarInAmps2<B::SampleDelta>: AmpLevels<B::SampleDelta>,
{
    ula.ensure_audio_frame_time(blep, sample_rate);
    ula.render_ay_audio_frame::<AyAmps<B::SampleDelta>>(blep, [0, 1, 2]);
    ula.render_earmic_out_audio_frame::<EarMicAmps4<B::SampleDelta>>(blep, channel);
    ula.render_ear_in_audio_frame::<EarInAmps2<B::SampleDelta>>(blep, channel);
    ula.end_audio_frame(blep)
}

/// The synchronous emulator engine: one CPU, one chipset, and the debugger/peripheral state
/// that rides alongside it. Not thread-safe by itself; [crate::scheduler::Scheduler] is what
/// gives it a home on a dedicated thread.
pub struct EmulatorContext {
    pub cpu: Z80NMOS,
    pub chipset: Chipset,
    pub keyboard: KeyboardMatrix,
    pub tape: TapeDeck,
    pub breakpoints: BreakpointSet,
    pub call_trace: CallTraceLog,
}

impl EmulatorContext {
    /// Builds a new emulator context for the given configuration, loading the supplied ROM
    /// banks into the freshly allocated chipset memory.
    pub fn init(config: &MachineConfig) -> Result<Self, ConfigError> {
        if !config.model.is_supported() {
            return Err(ConfigError::UnsupportedModel(config.model));
        }
        let mut chipset = match config.model {
            Model::Zx48 => Chipset::Zx48(Box::new(Zx48Chipset::default())),
            Model::Zx128 | Model::Pentagon | Model::Scorpion => {
                Chipset::Zx128(Box::new(Zx128Chipset::default()))
            }
            _ => unreachable!("rejected above by is_supported"),
        };
        for bank in &config.rom_set {
            chipset.load_rom_bank(bank)?;
        }
        let mut cpu = Z80NMOS::default();
        cpu.reset();
        Ok(EmulatorContext {
            cpu,
            chipset,
            keyboard: KeyboardMatrix::new(),
            tape: TapeDeck::default(),
            breakpoints: BreakpointSet::new(),
            call_trace: CallTraceLog::new(),
        })
    }

    // ---- Control API ----

    pub fn reset(&mut self, hard: bool) {
        self.chipset.reset(&mut self.cpu, hard);
    }

    pub fn press_key(&mut self, key: ExtendedKey) {
        self.keyboard.press(key);
        self.chipset.set_key_state(self.keyboard.key_state());
    }

    pub fn release_key(&mut self, key: ExtendedKey) {
        self.keyboard.release(key);
        self.chipset.set_key_state(self.keyboard.key_state());
    }

    /// Executes a single CPU instruction, honoring execution breakpoints.
    ///
    /// Returns `Ok(Some(id))` if a breakpoint fired exactly on the instruction that was about
    /// to execute (the instruction itself is still executed; callers stop *after* this call).
    pub fn step_instruction(&mut self) -> Result<Option<BreakpointId>, ControlError> {
        let pc = self.cpu.get_pc();
        let hit = self.breakpoints.handle_exec(pc, None);
        let code_slot: core::cell::RefCell<Option<Vec<u8>>> = core::cell::RefCell::new(None);
        self.chipset
            .execute_single_step(&mut self.cpu, Some(|deb: crate::z80emu::CpuDebug| {
                *code_slot.borrow_mut() = Some(deb.code.to_vec());
            }))
            .map_err(|_| ControlError::CpuFault)?;
        if let Some(code) = code_slot.into_inner() {
            let new_pc = self.cpu.get_pc();
            self.call_trace.observe(pc, &code, new_pc);
        }
        Ok(hit)
    }

    /// Executes one whole video frame's worth of instructions, stopping early (mid-frame) if an
    /// execution breakpoint fires.
    ///
    /// Call-flow tracing only happens along this per-instruction loop (and in
    /// [EmulatorContext::step_instruction]): the no-breakpoints fast path below runs the whole
    /// frame through [crate::chip::ControlUnit::execute_next_frame], which has no debug hook to
    /// observe individual instructions through.
    pub fn step_frame(&mut self) -> Option<BreakpointId> {
        if self.breakpoints.is_empty() {
            self.chipset.execute_next_frame(&mut self.cpu);
            return None;
        }
        self.chipset.ensure_next_frame();
        loop {
            let pc = self.cpu.get_pc();
            if let Some(id) = self.breakpoints.handle_exec(pc, None) {
                return Some(id);
            }
            let code_slot: core::cell::RefCell<Option<Vec<u8>>> = core::cell::RefCell::new(None);
            let _ = self
                .chipset
                .execute_single_step(&mut self.cpu, Some(|deb: crate::z80emu::CpuDebug| {
                    *code_slot.borrow_mut() = Some(deb.code.to_vec());
                }));
            if let Some(code) = code_slot.into_inner() {
                let new_pc = self.cpu.get_pc();
                self.call_trace.observe(pc, &code, new_pc);
            }
            if self.chipset.is_frame_over() {
                return None;
            }
        }
    }

    /// Runs frames until at least `cycles` T-states have elapsed.
    pub fn run_n_cycles(&mut self, cycles: u32) {
        let start = self.chipset.current_tstate();
        let mut elapsed: i64 = 0;
        while elapsed < cycles as i64 {
            self.chipset.execute_next_frame(&mut self.cpu);
            let now = self.chipset.current_tstate();
            elapsed = now as i64 - start as i64;
        }
    }

    // ---- Debug API ----

    pub fn direct_read(&self, addr: u16) -> u8 {
        self.chipset.read(addr)
    }

    pub fn direct_write(&mut self, addr: u16, val: u8) {
        self.chipset.write(addr, val)
    }

    pub fn get_registers(&self) -> Registers {
        read_registers(&self.cpu)
    }

    pub fn set_registers(&mut self, regs: &Registers) {
        write_registers(&mut self.cpu, regs)
    }

    pub fn add_breakpoint(&mut self, kind: BreakpointKind, scope: BreakpointScope) -> BreakpointId {
        self.breakpoints.add(kind, scope)
    }

    pub fn remove_breakpoint(&mut self, id: BreakpointId) -> Result<(), DebugError> {
        if self.breakpoints.remove(id) {
            Ok(())
        } else {
            Err(DebugError::UnknownBreakpoint(id))
        }
    }
}
