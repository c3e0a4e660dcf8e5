#![allow(dead_code)]

#[macro_use]
extern crate bitflags;

pub mod audio;
pub mod bus;
pub mod chip;
pub mod clock;
pub mod cpu_debug;
pub mod io;
pub mod keyboard;
pub mod machine;
pub mod memory;
pub mod formats;
pub mod peripherals;
pub mod scheduler;
pub mod video;

pub use zxcore_core::z80emu;

#[cfg(test)]
mod tests {
    #[test]
    fn it_works() {
        assert_eq!(2 + 2, 4);
    }
}
