/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! An extended keyboard on top of the raw 40-key [ZXKeyboardMap][crate::peripherals::ZXKeyboardMap]
//! matrix.
//!
//! Added: the base matrix only knows about the physical keys actually wired on a Spectrum
//! keyboard. A host front-end wants to offer cursor keys, Delete, Caps Lock, Break and the
//! various SYMBOL SHIFT punctuation shortcuts as keys in their own right, each of which maps
//! to one or more base key bits held down together (most of them share CAPS SHIFT or SYMBOL
//! SHIFT with other chords). [KeyboardMatrix] keeps a press counter per base key so releasing
//! one extended key never clears a modifier another extended key (or a plain Caps Shift key
//! press) still needs held.
use crate::peripherals::ZXKeyboardMap;

/// A key as offered to the host front-end: either one of the 40 keys wired directly on the
/// Spectrum keyboard, or a chord of base keys conventionally used to stand in for a key the
/// real keyboard doesn't have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedKey {
    /// Any of the 40 physically wired keys, addressed directly by its [ZXKeyboardMap] bit.
    Base(ZXKeyboardMap),
    CursorLeft,
    CursorRight,
    CursorUp,
    CursorDown,
    Delete,
    EditMode,
    CapsLock,
    TrueVideo,
    InvVideo,
    Graphics,
    Break,
}

impl ExtendedKey {
    /// The set of base keys that must be held down together to realize this key.
    pub fn chord(self) -> ZXKeyboardMap {
        use ZXKeyboardMap as K;
        match self {
            ExtendedKey::Base(k) => k,
            // CAPS SHIFT + digit conventions, per the ZX Spectrum BASIC manual's "extended mode".
            ExtendedKey::EditMode   => K::CS | K::N1,
            ExtendedKey::CapsLock   => K::CS | K::N2,
            ExtendedKey::TrueVideo  => K::CS | K::N3,
            ExtendedKey::InvVideo   => K::CS | K::N4,
            ExtendedKey::CursorLeft  => K::CS | K::N5,
            ExtendedKey::CursorDown  => K::CS | K::N6,
            ExtendedKey::CursorUp    => K::CS | K::N7,
            ExtendedKey::CursorRight => K::CS | K::N8,
            ExtendedKey::Graphics   => K::CS | K::N9,
            ExtendedKey::Delete     => K::CS | K::N0,
            ExtendedKey::Break      => K::CS | K::BR,
        }
    }
}

/// The number of distinct base key bits tracked by [KeyboardMatrix]'s press counters.
const NUM_KEYS: usize = 40;

/// A keyboard matrix that multiplexes [ExtendedKey] chords onto the underlying 40-bit
/// [ZXKeyboardMap], keeping a base key held for as long as any pressed [ExtendedKey] still
/// needs it.
#[derive(Debug, Clone)]
pub struct KeyboardMatrix {
    state: ZXKeyboardMap,
    counters: [u16; NUM_KEYS],
}

impl Default for KeyboardMatrix {
    fn default() -> Self {
        KeyboardMatrix { state: ZXKeyboardMap::empty(), counters: [0; NUM_KEYS] }
    }
}

impl KeyboardMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resulting [ZXKeyboardMap] to feed into a [KeyboardInterface][crate::peripherals::KeyboardInterface].
    pub fn key_state(&self) -> ZXKeyboardMap {
        self.state
    }

    /// Presses `key`, incrementing the counter of each base key in its chord and asserting
    /// it in [KeyboardMatrix::key_state] if it wasn't already held.
    pub fn press(&mut self, key: ExtendedKey) {
        for bit in base_bits(key.chord()) {
            let idx = bit_index(bit);
            if self.counters[idx] == 0 {
                self.state |= bit;
            }
            self.counters[idx] = self.counters[idx].saturating_add(1);
        }
    }

    /// Releases `key`, decrementing the counter of each base key in its chord and clearing it
    /// from [KeyboardMatrix::key_state] only once no other pressed [ExtendedKey] still needs it.
    pub fn release(&mut self, key: ExtendedKey) {
        for bit in base_bits(key.chord()) {
            let idx = bit_index(bit);
            if self.counters[idx] > 0 {
                self.counters[idx] -= 1;
                if self.counters[idx] == 0 {
                    self.state -= bit;
                }
            }
        }
    }

    /// Releases every currently pressed key and zeroes all counters.
    pub fn release_all(&mut self) {
        self.state = ZXKeyboardMap::empty();
        self.counters = [0; NUM_KEYS];
    }

    /// `true` if the base key `bit` is currently held by at least one pressed [ExtendedKey].
    pub fn is_pressed(&self, bit: ZXKeyboardMap) -> bool {
        self.counters[bit_index(bit)] > 0
    }
}

#[inline]
fn bit_index(bit: ZXKeyboardMap) -> usize {
    bit.bits().trailing_zeros() as usize
}

fn base_bits(chord: ZXKeyboardMap) -> impl Iterator<Item = ZXKeyboardMap> {
    let bits = chord.bits();
    (0..NUM_KEYS).filter_map(move |i| {
        let bit = 1u64 << i;
        if bits & bit != 0 {
            ZXKeyboardMap::from_bits(bit)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressing_and_releasing_a_plain_key_toggles_its_bit() {
        let mut kb = KeyboardMatrix::new();
        kb.press(ExtendedKey::Base(ZXKeyboardMap::A));
        assert!(kb.key_state().contains(ZXKeyboardMap::A));
        kb.release(ExtendedKey::Base(ZXKeyboardMap::A));
        assert!(!kb.key_state().contains(ZXKeyboardMap::A));
    }

    #[test]
    fn shared_modifier_stays_held_while_any_chord_needs_it() {
        let mut kb = KeyboardMatrix::new();
        kb.press(ExtendedKey::CursorLeft);  // CS + 5
        kb.press(ExtendedKey::Delete);      // CS + 0
        kb.release(ExtendedKey::CursorLeft);
        assert!(kb.key_state().contains(ZXKeyboardMap::CS), "Delete still needs CAPS SHIFT held");
        assert!(!kb.key_state().contains(ZXKeyboardMap::N5));
        kb.release(ExtendedKey::Delete);
        assert!(!kb.key_state().contains(ZXKeyboardMap::CS));
    }

    #[test]
    fn explicit_caps_shift_press_keeps_modifier_held_alongside_a_chord() {
        let mut kb = KeyboardMatrix::new();
        kb.press(ExtendedKey::Base(ZXKeyboardMap::CS));
        kb.press(ExtendedKey::CursorUp);
        kb.release(ExtendedKey::CursorUp);
        assert!(kb.key_state().contains(ZXKeyboardMap::CS), "the plain CAPS SHIFT press is still held");
        kb.release(ExtendedKey::Base(ZXKeyboardMap::CS));
        assert!(!kb.key_state().contains(ZXKeyboardMap::CS));
    }

    #[test]
    fn release_all_clears_counters_and_state() {
        let mut kb = KeyboardMatrix::new();
        kb.press(ExtendedKey::CursorLeft);
        kb.press(ExtendedKey::Break);
        kb.release_all();
        assert_eq!(kb.key_state(), ZXKeyboardMap::empty());
        assert!(!kb.is_pressed(ZXKeyboardMap::CS));
    }
}
