/*
    Copyright (C) 2020  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! File format utilities: tape pulse encoding, AY-file dumps and ZX Microdrive cartridge images.
//!
//! Snapshot (SNA/Z80), disk (TRD) and TR-DOS-encoded BASIC program formats live in the
//! optional [zxcore_formats] and [zxcore_peripherals] crates and are re-exported here when
//! their respective features are enabled, following the same pattern as [crate::bus].
pub mod ay;
pub mod ear_mic;
pub mod mdr;
pub mod read_ear;
pub mod tap;
pub mod tap_old;
pub mod tapedeck;

#[cfg(feature = "formats")]
pub use zxcore_formats::*;
