/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
/*! **TRD** (TR-DOS) disk image format utilities.

A `.trd` file is a flat, sector-linear dump of a TR-DOS formatted floppy: tracks in
ascending order, each track as side 0 then side 1, each side as 16 consecutive 256-byte
sectors (1..=16). There is no container header - only the disk's own catalog, held on
track 0, tells a reader how large the image logically is; many `.trd` files on disk are
truncated to the last occupied track for this reason, and [read_trd] extends them with
zeroed (unformatted) sectors up to the geometry implied by the disk info sector.

```text
Track 0, sectors 1-8 (2048 bytes): up to 128 catalog entries, 16 bytes each.
Track 0, sector 9, byte layout (TR-DOS "disk information" sector):
 0xE1      first free sector (0-15)
 0xE2      first free track
 0xE3      disk type (see DiskType)
 0xE4      file count
 0xE5-0xE6 free sector count, little-endian
 0xE7      TR-DOS identification byte, always 0x10
 0xF4-0xFE label (9 bytes)
```
*/
use std::io::{self, Read, Write, Error, ErrorKind};

use zxcore_peripherals::storage::fdc::{DiskImage, SectorInterleave, sector_size};

/// Bytes per TR-DOS sector.
pub const SECTOR_SIZE: usize = 256;
/// Sectors per track on any TR-DOS disk.
pub const SECTORS_PER_TRACK: u8 = 16;
/// Bytes occupied by the catalog (the first 8 sectors of track 0).
pub const CATALOG_SIZE: usize = 8 * SECTOR_SIZE;
/// Byte size of a single catalog entry.
pub const CATALOG_ENTRY_SIZE: usize = 16;
/// Maximum number of files a single TR-DOS catalog can hold.
pub const MAX_CATALOG_ENTRIES: usize = CATALOG_SIZE / CATALOG_ENTRY_SIZE;

const INFO_SECTOR: u8 = 9;
const OFF_FREE_SECTOR: usize = 0xE1;
const OFF_FREE_TRACK: usize = 0xE2;
const OFF_DISK_TYPE: usize = 0xE3;
const OFF_FILE_COUNT: usize = 0xE4;
const OFF_FREE_SECTORS: usize = 0xE5;
const OFF_TRDOS_ID: usize = 0xE7;
const OFF_LABEL: usize = 0xF4;
const LABEL_LEN: usize = 9;
const TRDOS_ID: u8 = 0x10;
/// Marks the end of the catalog (no further entries are occupied).
pub const ENTRY_END_MARKER: u8 = 0x00;
/// Marks a catalog entry whose file has been deleted.
pub const ENTRY_DELETED_MARKER: u8 = 0x01;

/// The disk geometry byte stored in the disk information sector, as interpreted by TR-DOS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskType {
    /// 80 tracks, double sided.
    Tracks80Double,
    /// 40 tracks, double sided.
    Tracks40Double,
    /// 80 tracks, single sided.
    Tracks80Single,
    /// 40 tracks, single sided.
    Tracks40Single,
}

impl DiskType {
    pub fn cylinders(self) -> u8 {
        match self {
            DiskType::Tracks80Double | DiskType::Tracks80Single => 80,
            DiskType::Tracks40Double | DiskType::Tracks40Single => 40,
        }
    }

    pub fn heads(self) -> u8 {
        match self {
            DiskType::Tracks80Double | DiskType::Tracks40Double => 2,
            DiskType::Tracks80Single | DiskType::Tracks40Single => 1,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            DiskType::Tracks80Double => 0x16,
            DiskType::Tracks40Double => 0x17,
            DiskType::Tracks80Single => 0x18,
            DiskType::Tracks40Single => 0x19,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x16 => Some(DiskType::Tracks80Double),
            0x17 => Some(DiskType::Tracks40Double),
            0x18 => Some(DiskType::Tracks80Single),
            0x19 => Some(DiskType::Tracks40Single),
            _ => None,
        }
    }
}

/// The TR-DOS "disk information" sector, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskInfo {
    pub disk_type: DiskType,
    pub first_free_sector: u8,
    pub first_free_track: u8,
    pub file_count: u8,
    pub free_sectors: u16,
    pub label: [u8; LABEL_LEN],
}

/// A single decoded TR-DOS catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: [u8; 8],
    pub extension: u8,
    pub start_address: u16,
    pub length: u16,
    pub length_sectors: u8,
    pub start_sector: u8,
    pub start_track: u8,
    pub deleted: bool,
}

impl CatalogEntry {
    fn decode(bytes: &[u8; CATALOG_ENTRY_SIZE]) -> Option<Self> {
        if bytes[0] == ENTRY_END_MARKER {
            return None;
        }
        let deleted = bytes[0] == ENTRY_DELETED_MARKER;
        let mut name = [0u8; 8];
        name.copy_from_slice(&bytes[0..8]);
        Some(CatalogEntry {
            name,
            extension: bytes[8],
            start_address: u16::from_le_bytes([bytes[9], bytes[10]]),
            length: u16::from_le_bytes([bytes[11], bytes[12]]),
            length_sectors: bytes[13],
            start_sector: bytes[14],
            start_track: bytes[15],
            deleted,
        })
    }

    fn encode(&self) -> [u8; CATALOG_ENTRY_SIZE] {
        let mut out = [0u8; CATALOG_ENTRY_SIZE];
        out[0..8].copy_from_slice(&self.name);
        out[8] = self.extension;
        out[9..11].copy_from_slice(&self.start_address.to_le_bytes());
        out[11..13].copy_from_slice(&self.length.to_le_bytes());
        out[13] = self.length_sectors;
        out[14] = self.start_sector;
        out[15] = self.start_track;
        if self.deleted {
            out[0] = ENTRY_DELETED_MARKER;
        }
        out
    }
}

fn track_bytes(image: &DiskImage, cylinder: u8, head: u8) -> io::Result<Vec<u8>> {
    let track = image.track(cylinder, head).ok_or_else(||
        Error::new(ErrorKind::InvalidData, "track out of range"))?;
    let mut out = Vec::with_capacity(SECTORS_PER_TRACK as usize * SECTOR_SIZE);
    for record in 1..=SECTORS_PER_TRACK {
        let sector = track.iter().find(|s| s.record == record).ok_or_else(||
            Error::new(ErrorKind::InvalidData, "missing sector in track"))?;
        out.extend_from_slice(&sector.data);
    }
    Ok(out)
}

/// Reads the disk information sector (track 0, sector 9) from an already loaded image.
pub fn disk_info(image: &DiskImage) -> io::Result<DiskInfo> {
    let track0 = track_bytes(image, 0, 0)?;
    let info = &track0[(INFO_SECTOR as usize - 1) * SECTOR_SIZE..INFO_SECTOR as usize * SECTOR_SIZE];
    if info[OFF_TRDOS_ID] != TRDOS_ID {
        return Err(Error::new(ErrorKind::InvalidData, "missing TR-DOS identification byte"));
    }
    let disk_type = DiskType::from_byte(info[OFF_DISK_TYPE])
        .ok_or_else(|| Error::new(ErrorKind::InvalidData, "unrecognized TR-DOS disk type byte"))?;
    let mut label = [0u8; LABEL_LEN];
    label.copy_from_slice(&info[OFF_LABEL..OFF_LABEL + LABEL_LEN]);
    Ok(DiskInfo {
        disk_type,
        first_free_sector: info[OFF_FREE_SECTOR],
        first_free_track: info[OFF_FREE_TRACK],
        file_count: info[OFF_FILE_COUNT],
        free_sectors: u16::from_le_bytes([info[OFF_FREE_SECTORS], info[OFF_FREE_SECTORS + 1]]),
        label,
    })
}

/// Reads the catalog (up to 128 entries) from track 0 of an already loaded image.
///
/// Stops at the first entry whose name byte is [ENTRY_END_MARKER]; deleted entries
/// ([ENTRY_DELETED_MARKER]) are still returned, with [CatalogEntry::deleted] set.
pub fn catalog(image: &DiskImage) -> io::Result<Vec<CatalogEntry>> {
    let track0 = track_bytes(image, 0, 0)?;
    let mut entries = Vec::new();
    for i in 0..MAX_CATALOG_ENTRIES {
        let bytes: &[u8; CATALOG_ENTRY_SIZE] =
            track0[i * CATALOG_ENTRY_SIZE..(i + 1) * CATALOG_ENTRY_SIZE].try_into().unwrap();
        match CatalogEntry::decode(bytes) {
            Some(entry) => entries.push(entry),
            None => break,
        }
    }
    Ok(entries)
}

/// Reads a `.trd` image from `rd`. Accepts files truncated to the last occupied track,
/// as produced by most TR-DOS tools, zero-filling the remainder up to the geometry named
/// by the disk information sector.
pub fn read_trd<R: Read>(mut rd: R) -> io::Result<DiskImage> {
    let mut raw = Vec::new();
    rd.read_to_end(&mut raw)?;
    if raw.len() < SECTORS_PER_TRACK as usize * SECTOR_SIZE {
        return Err(Error::new(ErrorKind::InvalidData, "file too small to contain a TR-DOS track 0"));
    }
    let track_size = SECTORS_PER_TRACK as usize * SECTOR_SIZE;
    let info_off = track_size - (SECTORS_PER_TRACK as usize - INFO_SECTOR as usize + 1) * SECTOR_SIZE
        + OFF_DISK_TYPE;
    let disk_type = DiskType::from_byte(*raw.get(info_off).unwrap_or(&0))
        .unwrap_or(DiskType::Tracks80Double);
    let cylinders = disk_type.cylinders();
    let heads = disk_type.heads();
    let total_size = cylinders as usize * heads as usize * track_size;
    raw.resize(total_size, 0);

    let mut image = DiskImage::blank(cylinders, heads, SECTORS_PER_TRACK, 1, SectorInterleave::TrDos1To2)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
    let sector_len = sector_size(1);
    for cyl in 0..cylinders {
        for head in 0..heads {
            let track_offset = (cyl as usize * heads as usize + head as usize) * track_size;
            let track = image.track_mut(cyl, head).unwrap();
            for record in 1..=SECTORS_PER_TRACK {
                let sector_offset = track_offset + (record as usize - 1) * sector_len;
                if let Some(sector) = track.iter_mut().find(|s| s.record == record) {
                    sector.data.copy_from_slice(&raw[sector_offset..sector_offset + sector_len]);
                }
            }
        }
    }
    Ok(image)
}

/// Serializes a disk image to the flat `.trd` layout: tracks in ascending order, each as
/// side 0 then side 1, sectors 1..=16 in physical (logical record) order.
pub fn write_trd<W: Write>(image: &DiskImage, mut wr: W) -> io::Result<usize> {
    let mut written = 0;
    for cyl in 0..image.cylinders {
        for head in 0..image.heads {
            let bytes = track_bytes(image, cyl, head)?;
            wr.write_all(&bytes)?;
            written += bytes.len();
        }
    }
    Ok(written)
}

/// Creates a freshly formatted, empty TR-DOS disk image with the given `label`, writing
/// a valid disk information sector and an empty (all-entries-free) catalog.
pub fn format(disk_type: DiskType, label: &[u8]) -> io::Result<DiskImage> {
    let cylinders = disk_type.cylinders();
    let heads = disk_type.heads();
    let mut image = DiskImage::blank(cylinders, heads, SECTORS_PER_TRACK, 1, SectorInterleave::TrDos1To2)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
    let total_sectors = (cylinders as u32 - 1) * heads as u32 * SECTORS_PER_TRACK as u32;
    {
        let track0 = image.track_mut(0, 0).unwrap();
        for sector in track0.iter_mut() {
            if sector.record >= 1 && sector.record <= 8 {
                sector.data.fill(0);
            }
        }
        let info_sector = track0.iter_mut().find(|s| s.record == INFO_SECTOR).unwrap();
        info_sector.data.fill(0);
        info_sector.data[OFF_FREE_SECTOR] = 0;
        info_sector.data[OFF_FREE_TRACK] = 1;
        info_sector.data[OFF_DISK_TYPE] = disk_type.to_byte();
        info_sector.data[OFF_FILE_COUNT] = 0;
        let free = (total_sectors as u16).to_le_bytes();
        info_sector.data[OFF_FREE_SECTORS..OFF_FREE_SECTORS + 2].copy_from_slice(&free);
        info_sector.data[OFF_TRDOS_ID] = TRDOS_ID;
        let len = label.len().min(LABEL_LEN);
        info_sector.data[OFF_LABEL..OFF_LABEL + len].copy_from_slice(&label[..len]);
        for b in info_sector.data[OFF_LABEL + len..OFF_LABEL + LABEL_LEN].iter_mut() {
            *b = b' ';
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_disk_reports_expected_disk_info() {
        let image = format(DiskType::Tracks80Double, b"TEST").unwrap();
        let info = disk_info(&image).unwrap();
        assert_eq!(info.disk_type, DiskType::Tracks80Double);
        assert_eq!(info.file_count, 0);
        assert_eq!(info.free_sectors, 79 * 2 * 16);
        assert_eq!(&info.label[..4], b"TEST");
    }

    #[test]
    fn empty_catalog_has_no_entries() {
        let image = format(DiskType::Tracks40Single, b"X").unwrap();
        assert!(catalog(&image).unwrap().is_empty());
    }

    #[test]
    fn round_trips_through_the_flat_byte_layout() {
        let image = format(DiskType::Tracks40Single, b"ROUNDTRIP").unwrap();
        let mut buf = Vec::new();
        write_trd(&image, &mut buf).unwrap();
        assert_eq!(buf.len(), 40 * 1 * SECTORS_PER_TRACK as usize * SECTOR_SIZE);
        let reloaded = read_trd(io::Cursor::new(buf)).unwrap();
        let info = disk_info(&reloaded).unwrap();
        assert_eq!(info.disk_type, DiskType::Tracks40Single);
    }

    #[test]
    fn catalog_entry_round_trips_through_encode_decode() {
        let entry = CatalogEntry {
            name: *b"HELLO   ",
            extension: b'B',
            start_address: 0x8000,
            length: 512,
            length_sectors: 2,
            start_sector: 1,
            start_track: 1,
            deleted: false,
        };
        let encoded = entry.encode();
        let decoded = CatalogEntry::decode(&encoded).unwrap();
        assert_eq!(decoded, entry);
    }
}
