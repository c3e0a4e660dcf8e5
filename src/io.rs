/*
    Copyright (C) 2020  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! I/O port related utilities that are not [BusDevice][crate::bus::BusDevice] implementations
//! themselves but are shared by more than one of them or by the host front-end.
pub mod ay;
