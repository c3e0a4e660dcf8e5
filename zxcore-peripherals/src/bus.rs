/*
    Copyright (C) 2020  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! System bus device emulators to be used with [ControlUnit][zxcore_core::chip::ControlUnit]s.
pub mod ay;
pub mod debug;
pub mod fdc;
pub mod joystick;
pub mod mouse;
pub mod parallel;
pub mod zxprinter;
