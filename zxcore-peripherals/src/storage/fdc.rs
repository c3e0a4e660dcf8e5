/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A `WD1793` floppy disk controller emulator and a generic sector-addressed disk image.
//!
//! This is not a port of any upstream ZXCORE module - the teacher crate ships no disk
//! controller at all - but it is grounded on the same conventions the rest of this crate's
//! peripherals use: a `bitflags!` status register (matching `chip::flags`'s style), plain
//! data structs with no interior `Rc`/`RefCell`, and a typed, non-panicking error surface
//! for malformed images (matching `zxcore_core::memory::ZxMemoryError`).
use core::fmt;
use std::error::Error;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use crc::{Crc, CRC_16_IBM_3740};

/// CRC-16/CCITT ("CCITT-FALSE": poly 0x1021, init 0xFFFF) as used by the WD1793 for both
/// address-mark and data-field checksums.
pub const CRC16_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// CPU clock used to convert disk timing into T-states (48K/128K/+3 Spectrum).
pub const CPU_CLOCK_HZ: u32 = 3_500_000;
/// T-states for a single disk revolution at the nominal 300RPM.
pub const TSTATES_PER_REVOLUTION: u32 = CPU_CLOCK_HZ / 5; // 200ms @ 300RPM
/// Nominal MFM data rate: 250 Kbit/s, i.e. one byte every 32us.
pub const TSTATES_PER_BYTE: u32 = CPU_CLOCK_HZ / (250_000 / 8); // 112
/// T-states for one step pulse at the fastest (6ms) stepping rate.
pub const TSTATES_STEP_6MS: u32 = CPU_CLOCK_HZ / 1000 * 6;
/// T-states the HEAD LOAD solenoid takes to settle (WD1793 default of 30ms with HLT strapped).
pub const TSTATES_HEAD_SETTLE: u32 = CPU_CLOCK_HZ / 1000 * 30;
/// Motor spins down and `MO` drops after this many disk revolutions of inactivity.
pub const MOTOR_OFF_REVOLUTIONS: u32 = 10;

bitflags! {
    /// WD1793 status register bits. Bits 1, 2 and 5 change meaning depending on whether the
    /// last command issued was Type I (Restore/Seek/Step) or Type II/III (Read/Write Sector,
    /// Read Address, Read/Write Track), exactly as on the real chip.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[derive(Default)]
    pub struct StatusFlags: u8 {
        /// Set while a command is being executed.
        const BUSY           = 0b0000_0001;
        /// Type I: toggles on each index pulse. Type II/III: Data Request (DRQ).
        const INDEX_OR_DRQ   = 0b0000_0010;
        /// Type I: head is positioned over track 0. Type II/III: Lost Data.
        const TRACK0_OR_LOST = 0b0000_0100;
        /// CRC error detected in the ID field or data field just read.
        const CRC_ERROR      = 0b0000_1000;
        /// Type I: seek error, track not found within 255 step pulses. Type II/III: record not found.
        const SEEK_OR_NOTFOUND = 0b0001_0000;
        /// Type I: head engaged and loaded. Type II (read): record-type/deleted-data mark.
        /// Write commands: write fault.
        const HEADLOADED_OR_RECTYPE_OR_FAULT = 0b0010_0000;
        /// The mounted disk is write protected (Write Sector/Write Track only).
        const WRITE_PROTECT  = 0b0100_0000;
        /// The drive reports not ready (no disk present or motor not yet up to speed).
        const NOT_READY      = 0b1000_0000;
    }
}

/// A command register value decoded into one of the four WD1793 command families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum Command {
    Restore      { step_rate: u8 },
    Seek         { step_rate: u8 },
    Step         { step_rate: u8, update_track: bool },
    StepIn       { step_rate: u8, update_track: bool },
    StepOut      { step_rate: u8, update_track: bool },
    ReadSector   { multiple: bool, side_compare: Option<bool> },
    WriteSector  { multiple: bool, side_compare: Option<bool>, deleted_mark: bool },
    ReadAddress,
    ReadTrack,
    WriteTrack,
    ForceInterrupt { immediate: bool },
}

impl Command {
    /// Decode a command register value, matching the 1793's opcode field layout (top nibble).
    pub fn decode(reg: u8) -> Command {
        let step_rate = reg & 0x03;
        match reg >> 4 {
            0x0 => Command::Restore { step_rate },
            0x1 => Command::Seek { step_rate },
            0x2 | 0x3 => Command::Step {
                step_rate, update_track: reg & 0x10 != 0,
            },
            0x4 | 0x5 => Command::StepIn {
                step_rate, update_track: reg & 0x10 != 0,
            },
            0x6 | 0x7 => Command::StepOut {
                step_rate, update_track: reg & 0x10 != 0,
            },
            0x8 | 0x9 => Command::ReadSector {
                multiple: reg & 0x10 != 0,
                side_compare: if reg & 0x02 != 0 { Some(reg & 0x08 != 0) } else { None },
            },
            0xA | 0xB => Command::WriteSector {
                multiple: reg & 0x10 != 0,
                side_compare: if reg & 0x02 != 0 { Some(reg & 0x08 != 0) } else { None },
                deleted_mark: reg & 0x01 != 0,
            },
            0xC => Command::ReadAddress,
            0xE => Command::ReadTrack,
            0xF => Command::WriteTrack,
            0xD => Command::ForceInterrupt { immediate: reg & 0x08 != 0 },
            _ => Command::ForceInterrupt { immediate: false },
        }
    }

    pub fn is_type1(self) -> bool {
        matches!(self,
            Command::Restore{..} | Command::Seek{..} | Command::Step{..} |
            Command::StepIn{..} | Command::StepOut{..})
    }
}

/// Controller execution phase, driven forward by [`Wd1793::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
enum Phase {
    Idle,
    /// Stepping the head, `ticks_left` T-states remain until the next step pulse or completion.
    Stepping { command: Command, ticks_left: i32, steps_left: u8 },
    /// Waiting the fixed head-load settle time before a Type II/III command may proceed.
    HeadSettle { command: Command, ticks_left: i32 },
    /// Searching for the addressed sector's ID field, `ticks_left` until next ID field check.
    Locating { command: Command, ticks_left: i32 },
    /// Transferring `len` data bytes to/from the data register, one every `TSTATES_PER_BYTE`.
    Transfer { command: Command, ticks_left: i32, index: usize, len: usize, write: bool },
    /// A short settle period after the final CRC byte, before BUSY clears.
    Finishing { ticks_left: i32 },
}

/// A physical sector addressed by Cylinder/Head/Record/sector-length-code, as laid out on an
/// MFM track and as stored within a [`DiskImage`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct Sector {
    pub cylinder: u8,
    pub head: u8,
    pub record: u8,
    /// Sector length code: 0 => 128, 1 => 256, 2 => 512, 3 => 1024 bytes.
    pub size_code: u8,
    pub data: Vec<u8>,
    /// True if the ID field's own CRC, as read from the image, was invalid.
    pub id_crc_ok: bool,
    /// True if the data field's CRC, as read from the image, was invalid.
    pub data_crc_ok: bool,
    pub deleted: bool,
}

impl Sector {
    pub fn new(cylinder: u8, head: u8, record: u8, size_code: u8) -> Self {
        Sector {
            cylinder, head, record, size_code,
            data: vec![0u8; sector_size(size_code)],
            id_crc_ok: true, data_crc_ok: true, deleted: false,
        }
    }
}

/// Decode a WD1793 sector-length code into a byte count.
pub fn sector_size(size_code: u8) -> usize {
    128usize << (size_code & 0x03)
}

/// The interleave (physical record-number assignment) used when laying out sectors on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum SectorInterleave {
    /// Sectors are numbered 1, 2, 3, ... in physical order (used by generic/raw images).
    Linear,
    /// TR-DOS's 1:2 interleave: physical order is 1, 9, 2, 10, 3, 11, ... for a 16-sector track.
    TrDos1To2,
}

impl Default for SectorInterleave {
    fn default() -> Self { SectorInterleave::TrDos1To2 }
}

impl SectorInterleave {
    /// Map a zero-based physical position on the track to the logical record number stored there.
    pub fn record_at(self, position: usize, sectors_per_track: usize) -> u8 {
        match self {
            SectorInterleave::Linear => (position + 1) as u8,
            SectorInterleave::TrDos1To2 => {
                let half = sectors_per_track / 2;
                let rec = if position < half {
                    position * 2
                } else {
                    (position - half) * 2 + 1
                };
                (rec + 1) as u8
            }
        }
    }
}

/// A single-sided or double-sided disk image addressed by cylinder/head/record, independent
/// of any particular on-disk file format (see `zxcore_formats::trd` for the TRD container).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct DiskImage {
    pub cylinders: u8,
    pub heads: u8,
    pub sectors_per_track: u8,
    pub size_code: u8,
    pub write_protect: bool,
    tracks: Vec<Vec<Sector>>,
}

#[derive(Debug)]
pub enum ImageError {
    InvalidGeometry { cylinders: u8, heads: u8, sectors_per_track: u8 },
    OutOfRange { cylinder: u8, head: u8 },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::InvalidGeometry { cylinders, heads, sectors_per_track } =>
                write!(f, "invalid disk geometry: {} cylinders, {} heads, {} sectors/track",
                       cylinders, heads, sectors_per_track),
            ImageError::OutOfRange { cylinder, head } =>
                write!(f, "track {}/{} is out of range for this image", cylinder, head),
        }
    }
}

impl Error for ImageError {}

impl DiskImage {
    pub fn blank(cylinders: u8, heads: u8, sectors_per_track: u8, size_code: u8,
                 interleave: SectorInterleave) -> Result<Self, ImageError>
    {
        if cylinders == 0 || heads == 0 || heads > 2 || sectors_per_track == 0 {
            return Err(ImageError::InvalidGeometry { cylinders, heads, sectors_per_track });
        }
        let mut tracks = Vec::with_capacity(cylinders as usize * heads as usize);
        for cyl in 0..cylinders {
            for head in 0..heads {
                let mut track: Vec<Sector> = (0..sectors_per_track).map(|pos| {
                    let record = interleave.record_at(pos as usize, sectors_per_track as usize);
                    Sector::new(cyl, head, record, size_code)
                }).collect();
                track.sort_by_key(|s| s.record);
                tracks.push(track);
            }
        }
        Ok(DiskImage { cylinders, heads, sectors_per_track, size_code, write_protect: false, tracks })
    }

    fn track_index(&self, cylinder: u8, head: u8) -> Option<usize> {
        if cylinder >= self.cylinders || head >= self.heads {
            return None;
        }
        Some(cylinder as usize * self.heads as usize + head as usize)
    }

    pub fn track(&self, cylinder: u8, head: u8) -> Option<&[Sector]> {
        self.track_index(cylinder, head).map(|i| self.tracks[i].as_slice())
    }

    pub fn track_mut(&mut self, cylinder: u8, head: u8) -> Option<&mut Vec<Sector>> {
        self.track_index(cylinder, head).map(move |i| &mut self.tracks[i])
    }

    pub fn sector(&self, cylinder: u8, head: u8, record: u8) -> Option<&Sector> {
        self.track(cylinder, head)?.iter().find(|s| s.record == record)
    }

    pub fn sector_mut(&mut self, cylinder: u8, head: u8, record: u8) -> Option<&mut Sector> {
        self.track_mut(cylinder, head)?.iter_mut().find(|s| s.record == record)
    }

    pub fn sector_at_position(&self, cylinder: u8, head: u8, position: usize) -> Option<&Sector> {
        self.track(cylinder, head)?.get(position)
    }
}

/// Per-drive mounted-media and motion state, tracked independently of the shared controller
/// registers (the real WD1793 is wired to up to four drives via the drive-select lines on the
/// host system's port, here modelled one level up in the bus device).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct DriveState {
    pub image: Option<DiskImage>,
    pub cylinder: u8,
    pub side: bool,
    pub motor_on: bool,
    pub changed: bool,
}

impl DriveState {
    pub fn is_track0(&self) -> bool {
        self.cylinder == 0
    }

    pub fn is_write_protected(&self) -> bool {
        self.image.as_ref().map_or(false, |img| img.write_protect)
    }

    pub fn is_ready(&self) -> bool {
        self.image.is_some()
    }
}

/// A cycle-driven WD1793 floppy disk controller emulator.
///
/// The controller owns its four register latches (command/status share one address, as do
/// track/sector/data) and the command execution state machine; it does not own the drives or
/// media directly - those are passed in by the owning bus device on each [`Wd1793::tick`] so
/// that drive-select and side-select (both host-side, not part of the 1793 itself) stay where
/// the Betadisk interface actually implements them.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct Wd1793 {
    status: StatusFlags,
    track_reg: u8,
    sector_reg: u8,
    data_reg: u8,
    last_command: Option<Command>,
    phase: Phase,
    data_request: bool,
    interrupt_request: bool,
    step_direction_in: bool,
    crc: u16,
    /// Byte-granular T-state remainder carried over between `tick` calls.
    pending_ts: i32,
}

impl Default for Wd1793 {
    fn default() -> Self {
        Wd1793 {
            status: StatusFlags::TRACK0_OR_LOST,
            track_reg: 0,
            sector_reg: 1,
            data_reg: 0,
            last_command: None,
            phase: Phase::Idle,
            data_request: false,
            interrupt_request: false,
            step_direction_in: true,
            crc: 0,
            pending_ts: 0,
        }
    }
}

impl Wd1793 {
    pub fn new() -> Self { Self::default() }

    pub fn status(&self, drive: &DriveState) -> u8 {
        let mut flags = self.status;
        flags.set(StatusFlags::NOT_READY, !drive.is_ready());
        match self.last_command {
            Some(cmd) if cmd.is_type1() => {
                flags.set(StatusFlags::TRACK0_OR_LOST, drive.is_track0());
                flags.set(StatusFlags::WRITE_PROTECT, drive.is_write_protected());
            }
            _ => {
                flags.set(StatusFlags::INDEX_OR_DRQ, self.data_request);
            }
        }
        flags.bits()
    }

    pub fn track(&self) -> u8 { self.track_reg }
    pub fn set_track(&mut self, v: u8) { self.track_reg = v; }

    pub fn sector(&self) -> u8 { self.sector_reg }
    pub fn set_sector(&mut self, v: u8) { self.sector_reg = v; }

    pub fn data(&self) -> u8 { self.data_reg }

    pub fn is_busy(&self) -> bool { !matches!(self.phase, Phase::Idle) }

    pub fn data_request_pending(&self) -> bool { self.data_request }

    pub fn interrupt_request_pending(&self) -> bool { self.interrupt_request }

    pub fn ack_interrupt(&mut self) { self.interrupt_request = false; }

    /// Issue a new command. Corresponds to a CPU write to the command/status port (0x1F).
    pub fn execute(&mut self, reg: u8, drive: &mut DriveState) {
        let command = Command::decode(reg);
        self.last_command = Some(command);
        self.interrupt_request = false;
        if let Command::ForceInterrupt { .. } = command {
            self.phase = Phase::Idle;
            self.status.remove(StatusFlags::BUSY);
            self.data_request = false;
            self.interrupt_request = true;
            return;
        }
        self.status.insert(StatusFlags::BUSY);
        self.status.remove(StatusFlags::CRC_ERROR | StatusFlags::SEEK_OR_NOTFOUND);
        self.data_request = false;
        drive.motor_on = true;
        self.phase = match command {
            Command::Restore { step_rate } => {
                self.track_reg = 0xFF;
                Phase::Stepping { command, ticks_left: step_ticks(step_rate), steps_left: 255 }
            }
            Command::Seek { step_rate } => {
                let steps = (self.data_reg as i16 - self.track_reg as i16).unsigned_abs() as u8;
                self.step_direction_in = self.data_reg >= self.track_reg;
                Phase::Stepping { command, ticks_left: step_ticks(step_rate), steps_left: steps }
            }
            Command::Step { step_rate, .. } | Command::StepIn { step_rate, .. } |
            Command::StepOut { step_rate, .. } => {
                Phase::Stepping { command, ticks_left: step_ticks(step_rate), steps_left: 1 }
            }
            Command::ReadSector { .. } | Command::WriteSector { .. } |
            Command::ReadAddress | Command::ReadTrack | Command::WriteTrack => {
                Phase::HeadSettle { command, ticks_left: TSTATES_HEAD_SETTLE as i32 }
            }
            Command::ForceInterrupt { .. } => unreachable!(),
        };
    }

    /// Write the data register. During a write transfer this feeds the byte being written.
    pub fn write_data(&mut self, value: u8) {
        self.data_reg = value;
        self.data_request = false;
    }

    /// Read the data register, clearing DRQ. During a read transfer the controller refills
    /// it on the next [`Wd1793::tick`].
    pub fn read_data(&mut self) -> u8 {
        self.data_request = false;
        self.data_reg
    }

    /// Advance the controller state machine by `delta` T-states (as consumed by the CPU, or by
    /// the frame scheduler while the CPU is halted/contended).
    pub fn tick(&mut self, delta: i32, drive: &mut DriveState) {
        self.pending_ts += delta;
        while self.pending_ts > 0 {
            let consumed = self.step_phase(drive);
            self.pending_ts -= consumed;
            if consumed == 0 { break; }
        }
    }

    fn step_phase(&mut self, drive: &mut DriveState) -> i32 {
        match self.phase {
            Phase::Idle => 0,
            Phase::Stepping { command, ticks_left, steps_left } => {
                if ticks_left > 0 {
                    let step = ticks_left.min(self.pending_ts.max(1));
                    self.phase = Phase::Stepping { command, ticks_left: ticks_left - step, steps_left };
                    return step;
                }
                self.apply_step(command, drive);
                if steps_left > 1 {
                    self.phase = Phase::Stepping {
                        command, ticks_left: step_ticks(2), steps_left: steps_left - 1,
                    };
                } else {
                    self.status.remove(StatusFlags::BUSY);
                    self.status.insert(StatusFlags::HEADLOADED_OR_RECTYPE_OR_FAULT);
                    self.interrupt_request = true;
                    self.phase = Phase::Idle;
                }
                1
            }
            Phase::HeadSettle { command, ticks_left } => {
                if ticks_left > 0 {
                    let step = ticks_left.min(self.pending_ts.max(1));
                    self.phase = Phase::HeadSettle { command, ticks_left: ticks_left - step };
                    return step;
                }
                self.begin_locate(command, drive);
                1
            }
            Phase::Locating { command, ticks_left } => {
                if ticks_left > 0 {
                    let step = ticks_left.min(self.pending_ts.max(1));
                    self.phase = Phase::Locating { command, ticks_left: ticks_left - step };
                    return step;
                }
                self.locate_found(command, drive);
                1
            }
            Phase::Transfer { command, ticks_left, index, len, write } => {
                if ticks_left > 0 {
                    let step = ticks_left.min(self.pending_ts.max(1));
                    self.phase = Phase::Transfer { command, ticks_left: ticks_left - step, index, len, write };
                    return step;
                }
                self.transfer_byte(command, drive, index, len, write);
                (TSTATES_PER_BYTE as i32).max(1)
            }
            Phase::Finishing { ticks_left } => {
                if ticks_left > 0 {
                    let step = ticks_left.min(self.pending_ts.max(1));
                    self.phase = Phase::Finishing { ticks_left: ticks_left - step };
                    return step;
                }
                self.status.remove(StatusFlags::BUSY);
                self.interrupt_request = true;
                self.phase = Phase::Idle;
                1
            }
        }
    }

    fn apply_step(&mut self, command: Command, drive: &mut DriveState) {
        match command {
            Command::Restore { .. } => {
                drive.cylinder = 0;
                self.track_reg = 0;
            }
            Command::Seek { .. } => {
                if self.step_direction_in {
                    drive.cylinder = drive.cylinder.saturating_add(1);
                } else if drive.cylinder > 0 {
                    drive.cylinder -= 1;
                }
                self.track_reg = drive.cylinder;
                if drive.cylinder == self.data_reg { /* converged */ }
            }
            Command::Step { update_track, .. } => {
                if self.step_direction_in {
                    drive.cylinder = drive.cylinder.saturating_add(1);
                } else if drive.cylinder > 0 {
                    drive.cylinder -= 1;
                }
                if update_track { self.track_reg = drive.cylinder; }
            }
            Command::StepIn { update_track, .. } => {
                self.step_direction_in = true;
                drive.cylinder = drive.cylinder.saturating_add(1);
                if update_track { self.track_reg = drive.cylinder; }
            }
            Command::StepOut { update_track, .. } => {
                self.step_direction_in = false;
                if drive.cylinder > 0 { drive.cylinder -= 1; }
                if update_track { self.track_reg = drive.cylinder; }
            }
            _ => {}
        }
    }

    fn begin_locate(&mut self, command: Command, _drive: &mut DriveState) {
        self.phase = Phase::Locating { command, ticks_left: TSTATES_PER_BYTE as i32 * 6 };
    }

    fn locate_found(&mut self, command: Command, drive: &mut DriveState) {
        let Some(image) = drive.image.as_ref() else {
            self.status.insert(StatusFlags::SEEK_OR_NOTFOUND);
            self.finish(false);
            return;
        };
        match command {
            Command::ReadSector { .. } => {
                if let Some(sector) = image.sector(drive.cylinder, drive.side as u8, self.sector_reg) {
                    if !sector.id_crc_ok || !sector.data_crc_ok {
                        self.status.insert(StatusFlags::CRC_ERROR);
                    }
                    self.status.set(StatusFlags::HEADLOADED_OR_RECTYPE_OR_FAULT, sector.deleted);
                    let len = sector.data.len();
                    self.data_request = true;
                    self.phase = Phase::Transfer {
                        command, ticks_left: TSTATES_PER_BYTE as i32, index: 0, len, write: false,
                    };
                } else {
                    self.status.insert(StatusFlags::SEEK_OR_NOTFOUND);
                    self.finish(false);
                }
            }
            Command::WriteSector { .. } => {
                if drive.is_write_protected() {
                    self.status.insert(StatusFlags::WRITE_PROTECT);
                    self.finish(false);
                } else if image.sector(drive.cylinder, drive.side as u8, self.sector_reg).is_some() {
                    let len = sector_size(image.size_code);
                    self.data_request = true;
                    self.phase = Phase::Transfer {
                        command, ticks_left: TSTATES_PER_BYTE as i32, index: 0, len, write: true,
                    };
                } else {
                    self.status.insert(StatusFlags::SEEK_OR_NOTFOUND);
                    self.finish(false);
                }
            }
            Command::ReadAddress => {
                if let Some(sector) = image.sector_at_position(drive.cylinder, drive.side as u8, 0) {
                    self.sector_reg = sector.cylinder;
                    self.data_reg = sector.cylinder;
                    self.data_request = true;
                    self.phase = Phase::Transfer {
                        command, ticks_left: TSTATES_PER_BYTE as i32, index: 0, len: 6, write: false,
                    };
                } else {
                    self.status.insert(StatusFlags::SEEK_OR_NOTFOUND);
                    self.finish(false);
                }
            }
            Command::ReadTrack | Command::WriteTrack => {
                self.finish(true);
            }
            _ => self.finish(true),
        }
    }

    fn transfer_byte(&mut self, command: Command, drive: &mut DriveState,
                      index: usize, len: usize, write: bool) {
        if write {
            if let Some(sector) = drive.image.as_mut()
                .and_then(|img| img.sector_mut(drive.cylinder, drive.side as u8, self.sector_reg))
            {
                if index < sector.data.len() {
                    sector.data[index] = self.data_reg;
                }
                sector.data_crc_ok = true;
            }
        } else if let Command::ReadAddress = command {
            self.data_reg = match index {
                0 => drive.cylinder,
                1 => drive.side as u8,
                2 => self.sector_reg,
                3 => 2, // 512-byte sectors by convention for TR-DOS images
                4 | 5 => 0,
                _ => 0,
            };
        } else if let Some(sector) = drive.image.as_ref()
            .and_then(|img| img.sector(drive.cylinder, drive.side as u8, self.sector_reg))
        {
            self.data_reg = sector.data.get(index).copied().unwrap_or(0);
        }
        self.data_request = true;
        let next = index + 1;
        if next >= len {
            drive.changed = write;
            self.phase = Phase::Finishing { ticks_left: TSTATES_PER_BYTE as i32 };
        } else {
            self.phase = Phase::Transfer {
                command, ticks_left: TSTATES_PER_BYTE as i32, index: next, len, write,
            };
        }
    }

    fn finish(&mut self, _ok: bool) {
        self.status.remove(StatusFlags::BUSY);
        self.data_request = false;
        self.interrupt_request = true;
        self.phase = Phase::Idle;
    }
}

fn step_ticks(rate: u8) -> i32 {
    // Type I step-rate field: 0=6ms 1=12ms 2=20ms 3=30ms @ 1MHz reference clock.
    let ms: u32 = match rate & 0x03 {
        0 => 6,
        1 => 12,
        2 => 20,
        _ => 30,
    };
    (CPU_CLOCK_HZ / 1000 * ms) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_restore_and_seek() {
        assert_eq!(Command::decode(0x00), Command::Restore { step_rate: 0 });
        assert_eq!(Command::decode(0x13), Command::Seek { step_rate: 3 });
    }

    #[test]
    fn decodes_read_write_sector_flags() {
        match Command::decode(0x80) {
            Command::ReadSector { multiple, side_compare } => {
                assert!(!multiple);
                assert_eq!(side_compare, None);
            }
            other => panic!("unexpected {:?}", other),
        }
        match Command::decode(0xA1) {
            Command::WriteSector { deleted_mark, .. } => assert!(deleted_mark),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn trdos_interleave_matches_1_to_2_pattern() {
        let il = SectorInterleave::TrDos1To2;
        let recs: Vec<u8> = (0..16).map(|p| il.record_at(p, 16)).collect();
        assert_eq!(recs, vec![1, 3, 5, 7, 9, 11, 13, 15, 2, 4, 6, 8, 10, 12, 14, 16]);
    }

    #[test]
    fn blank_image_has_expected_geometry_and_sector_count() {
        let img = DiskImage::blank(80, 2, 16, 2, SectorInterleave::TrDos1To2).unwrap();
        assert_eq!(img.track(0, 0).unwrap().len(), 16);
        assert_eq!(img.track(79, 1).unwrap().len(), 16);
        assert!(img.track(80, 0).is_none());
        assert_eq!(sector_size(img.size_code), 512);
    }

    #[test]
    fn restore_drives_head_to_track_zero_and_raises_interrupt() {
        let mut fdc = Wd1793::new();
        let mut drive = DriveState { image: Some(
            DiskImage::blank(80, 2, 16, 2, SectorInterleave::TrDos1To2).unwrap()
        ), cylinder: 40, ..Default::default() };
        fdc.execute(0x00, &mut drive);
        assert!(fdc.is_busy());
        for _ in 0..1000 {
            fdc.tick(TSTATES_STEP_6MS as i32 + 1000, &mut drive);
            if !fdc.is_busy() { break; }
        }
        assert!(!fdc.is_busy());
        assert_eq!(drive.cylinder, 0);
        assert!(fdc.interrupt_request_pending());
    }

    #[test]
    fn read_sector_not_found_sets_status_bit() {
        let mut fdc = Wd1793::new();
        let mut drive = DriveState { image: Some(
            DiskImage::blank(80, 2, 16, 2, SectorInterleave::TrDos1To2).unwrap()
        ), ..Default::default() };
        fdc.set_sector(200);
        fdc.execute(0x80, &mut drive);
        for _ in 0..1000 {
            fdc.tick(TSTATES_PER_BYTE as i32 * 8, &mut drive);
            if !fdc.is_busy() { break; }
        }
        assert!(StatusFlags::from_bits_truncate(fdc.status(&drive))
            .contains(StatusFlags::SEEK_OR_NOTFOUND));
    }
}
