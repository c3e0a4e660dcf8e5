/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A bus device for the Betadisk (TR-DOS) floppy disk interface, built around a [Wd1793]
//! controller. Grounded on the same `BusDevice` daisy-chain shape as [super::mouse]'s
//! `MouseBusDevice` and [super::joystick]'s `JoystickBusDevice`, but the four Betadisk ports
//! don't fit a single [PortAddress] mask/bits pair (the 0xFF system register shares its high
//! bits with the 0x7F data port), so matching is done directly on the low byte here instead.
use core::num::NonZeroU16;
use core::fmt;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use zxcore_core::bus::BusDevice;

use super::ay::PassByAyAudioBusDevice;
pub use crate::storage::fdc::{Wd1793, DriveState, DiskImage, Sector, SectorInterleave};

/// Command/status register port (read: status, write: command).
pub const PORT_COMMAND: u8 = 0x1F;
/// Track register port.
pub const PORT_TRACK: u8 = 0x3F;
/// Sector register port.
pub const PORT_SECTOR: u8 = 0x5F;
/// Data register port.
pub const PORT_DATA: u8 = 0x7F;
/// System register port: drive select (bits 0-1), `/RESET` (bit 2, active low),
/// density select (bit 3), side select (bit 4, 0 = side 0).
pub const PORT_SYSTEM: u8 = 0xFF;

bitflags! {
    /// The Betadisk system register, latched at port `0xFF`.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[derive(Default)]
    pub struct SystemFlags: u8 {
        const DRIVE_A   = 0b0000_0001;
        const DRIVE_B   = 0b0000_0010;
        const DRIVE_SEL = Self::DRIVE_A.bits | Self::DRIVE_B.bits;
        /// Active low: 0 holds the WD1793 in reset.
        const RESET_N   = 0b0000_0100;
        const DENSITY   = 0b0000_1000;
        /// 0 selects side 0, 1 selects side 1.
        const SIDE      = 0b0001_0000;
    }
}

/// A Betadisk (TR-DOS) floppy disk interface [BusDevice], with up to four drives.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct FdcBusDevice<D> {
    #[cfg_attr(feature = "snapshot", serde(default))]
    pub fdc: Wd1793,
    #[cfg_attr(feature = "snapshot", serde(default))]
    pub drives: [DriveState; 4],
    system: SystemFlags,
    #[cfg_attr(feature = "snapshot", serde(default))]
    bus: D,
}

impl<D: Default> Default for FdcBusDevice<D> {
    fn default() -> Self {
        FdcBusDevice {
            fdc: Wd1793::new(),
            drives: Default::default(),
            system: SystemFlags::RESET_N,
            bus: D::default(),
        }
    }
}

impl<D> fmt::Display for FdcBusDevice<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Betadisk (TR-DOS)")
    }
}

impl<D> FdcBusDevice<D> {
    /// Returns the currently selected drive index (0-3), or `None` if no drive select bit
    /// is asserted (the Betadisk interface requires exactly one of bits 0-1 at a time; if
    /// none is set the controller sees no drive ready).
    pub fn selected_drive(&self) -> Option<usize> {
        if self.system.contains(SystemFlags::DRIVE_A) {
            Some(0)
        } else if self.system.contains(SystemFlags::DRIVE_B) {
            Some(1)
        } else {
            None
        }
    }

    fn with_selected<R>(&mut self, f: impl FnOnce(&mut Wd1793, &mut DriveState) -> R) -> Option<R> {
        let idx = self.selected_drive()?;
        let drive = &mut self.drives[idx];
        drive.side = !self.system.contains(SystemFlags::SIDE);
        Some(f(&mut self.fdc, drive))
    }

    pub fn insert_disk(&mut self, drive: usize, image: DiskImage) {
        if let Some(d) = self.drives.get_mut(drive) {
            d.image = Some(image);
            d.changed = false;
        }
    }

    pub fn eject_disk(&mut self, drive: usize) -> Option<DiskImage> {
        self.drives.get_mut(drive).and_then(|d| d.image.take())
    }

    /// Advance the controller's internal timing state by `delta` T-states. Must be called
    /// once per frame (or more often) by the owning chipset/scheduler, independently of any
    /// port access, since the WD1793 keeps running (stepping, searching, transferring) even
    /// when the CPU isn't polling it.
    pub fn tick(&mut self, delta: i32) {
        if let Some(idx) = self.selected_drive() {
            self.fdc.tick(delta, &mut self.drives[idx]);
        }
    }
}

impl<D> PassByAyAudioBusDevice for FdcBusDevice<D> {}

impl<D> BusDevice for FdcBusDevice<D>
    where D: BusDevice
{
    type Timestamp = D::Timestamp;
    type NextDevice = D;

    #[inline]
    fn next_device_mut(&mut self) -> &mut Self::NextDevice {
        &mut self.bus
    }

    #[inline]
    fn next_device_ref(&self) -> &Self::NextDevice {
        &self.bus
    }

    #[inline]
    fn into_next_device(self) -> Self::NextDevice {
        self.bus
    }

    fn reset(&mut self, timestamp: Self::Timestamp) {
        self.system = SystemFlags::RESET_N;
        self.fdc = Wd1793::new();
        self.bus.reset(timestamp);
    }

    #[inline]
    fn read_io(&mut self, port: u16, timestamp: Self::Timestamp) -> Option<(u8, Option<NonZeroU16>)> {
        let bus_data = self.bus.read_io(port, timestamp);
        let fdc_data = match port as u8 {
            PORT_COMMAND => Some(self.with_selected(|fdc, drive| fdc.status(drive)).unwrap_or(0xFF)),
            PORT_TRACK => Some(self.fdc.track()),
            PORT_SECTOR => Some(self.fdc.sector()),
            PORT_DATA => Some(self.fdc.read_data()),
            _ => None,
        };
        if let Some(data) = fdc_data {
            if let Some((bus_byte, ws)) = bus_data {
                return Some((bus_byte & data, ws));
            }
            return Some((data, None));
        }
        bus_data
    }

    #[inline]
    fn write_io(&mut self, port: u16, data: u8, timestamp: Self::Timestamp) -> Option<u16> {
        match port as u8 {
            PORT_COMMAND => {
                self.with_selected(|fdc, drive| fdc.execute(data, drive));
                return Some(0);
            }
            PORT_TRACK => {
                self.fdc.set_track(data);
                return Some(0);
            }
            PORT_SECTOR => {
                self.fdc.set_sector(data);
                return Some(0);
            }
            PORT_DATA => {
                self.fdc.write_data(data);
                return Some(0);
            }
            PORT_SYSTEM => {
                let was_reset = !self.system.contains(SystemFlags::RESET_N);
                self.system = SystemFlags::from_bits_truncate(data);
                if was_reset && self.system.contains(SystemFlags::RESET_N) {
                    self.fdc = Wd1793::new();
                }
                return Some(0);
            }
            _ => {}
        }
        self.bus.write_io(port, data, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zxcore_core::bus::NullDevice;

    type TestFdc = FdcBusDevice<NullDevice<i32>>;

    #[test]
    fn selects_drive_from_system_register() {
        let mut dev = TestFdc::default();
        dev.write_io(0x00FF, SystemFlags::DRIVE_A.bits() | SystemFlags::RESET_N.bits(), 0);
        assert_eq!(dev.selected_drive(), Some(0));
        dev.write_io(0x00FF, SystemFlags::DRIVE_B.bits() | SystemFlags::RESET_N.bits(), 0);
        assert_eq!(dev.selected_drive(), Some(1));
    }

    #[test]
    fn status_reads_all_ones_when_no_drive_selected() {
        let mut dev = TestFdc::default();
        dev.write_io(0x00FF, SystemFlags::RESET_N.bits(), 0);
        let (data, _) = dev.read_io(0x001F, 0).unwrap();
        assert_eq!(data, 0xFF);
    }

    #[test]
    fn track_and_sector_registers_round_trip() {
        let mut dev = TestFdc::default();
        dev.write_io(0x003F, 42, 0);
        dev.write_io(0x005F, 7, 0);
        assert_eq!(dev.read_io(0x003F, 0).unwrap().0, 42);
        assert_eq!(dev.read_io(0x005F, 0).unwrap().0, 7);
    }

    #[test]
    fn reset_line_reinitializes_controller() {
        let mut dev = TestFdc::default();
        dev.write_io(0x003F, 99, 0);
        dev.write_io(0x00FF, 0, 0); // RESET_N low: hold in reset
        dev.write_io(0x00FF, SystemFlags::RESET_N.bits(), 0); // release
        assert_eq!(dev.fdc.track(), 0);
    }
}
