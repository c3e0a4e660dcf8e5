/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! ZX Spectrum BASIC tokenizer, detokenizer and in-memory program injection.
//!
//! This is entirely new code - the teacher crate has no BASIC-aware tooling at all - built
//! against [ZxMemory] for all RAM access (never raw pointer arithmetic) and with a typed,
//! non-panicking error surface for malformed program text, matching the idiom
//! [zxcore_core::memory::ZxMemoryError] sets for the rest of this workspace.
use core::fmt;
use std::error::Error as StdError;

use zxcore_core::memory::ZxMemory;

/// Marks the end of a tokenized BASIC line.
pub const LINE_END: u8 = 0x0D;
/// Precedes the 5-byte binary ("hidden") representation of a number literal.
pub const NUMBER_MARKER: u8 = 0x0E;
const HIDDEN_NUMBER_LEN: usize = 5;

const SYSVAR_ERR_NR: u16 = 0x5C3A;
const SYSVAR_VARS: u16 = 0x5C4B;
const SYSVAR_PROG: u16 = 0x5C53;
const SYSVAR_NXTLIN: u16 = 0x5C55;
const SYSVAR_E_LINE: u16 = 0x5C59;
const SYSVAR_CH_ADD: u16 = 0x5C5D;
const SYSVAR_WORKSP: u16 = 0x5C61;
const SYSVAR_STKBOT: u16 = 0x5C63;
const SYSVAR_STKEND: u16 = 0x5C65;

/// Default program start address for a 48K Spectrum, just past the system variables area.
pub const DEFAULT_PROG_START: u16 = 0x5CCB;

/// Errors returned while tokenizing or injecting a BASIC program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicError {
    /// A numbered-line program contained a line without a leading line number.
    MissingLineNumber(String),
    /// A line number fell outside the valid BASIC range of 0..=9999.
    LineNumberOutOfRange(u32),
    /// A string literal was never closed with a matching `"`.
    UnterminatedString,
}

impl fmt::Display for BasicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicError::MissingLineNumber(line) =>
                write!(f, "line has no leading line number: {:?}", line),
            BasicError::LineNumberOutOfRange(n) =>
                write!(f, "line number {} is out of range (0..=9999)", n),
            BasicError::UnterminatedString =>
                write!(f, "unterminated string literal"),
        }
    }
}

impl StdError for BasicError {}

type Result<T> = core::result::Result<T, BasicError>;

/// BASIC keyword to token byte mappings (tokens occupy 0xA3..=0xFF).
///
/// `SPECTRUM` (0xA3) and `PLAY` (0xA4) only exist on the 128K ROM's extended keyword set;
/// they're listed here alongside the 48K-common 0xA5..=0xFF range rather than split out,
/// since a 48K machine simply never emits or accepts them.
///
/// Multi-word keywords are listed as the literal text ZX BASIC expects them to appear in
/// (a single embedded space, or `#` directly attached as in `OPEN #`/`CLOSE #`); the
/// tokenizer always looks for the longest match starting at the current position, so a
/// multi-word entry wins over any single-word keyword that happens to be its prefix.
pub const KEYWORDS: &[(&str, u8)] = &[
    ("SPECTRUM", 0xA3), ("PLAY", 0xA4),
    ("RND", 0xA5), ("INKEY$", 0xA6), ("PI", 0xA7), ("FN", 0xA8), ("POINT", 0xA9),
    ("SCREEN$", 0xAA), ("ATTR", 0xAB), ("AT", 0xAC), ("TAB", 0xAD), ("VAL$", 0xAE),
    ("CODE", 0xAF), ("VAL", 0xB0), ("LEN", 0xB1), ("SIN", 0xB2), ("COS", 0xB3),
    ("TAN", 0xB4), ("ASN", 0xB5), ("ACS", 0xB6), ("ATN", 0xB7), ("LN", 0xB8),
    ("EXP", 0xB9), ("INT", 0xBA), ("SQR", 0xBB), ("SGN", 0xBC), ("ABS", 0xBD),
    ("PEEK", 0xBE), ("IN", 0xBF), ("USR", 0xC0), ("STR$", 0xC1), ("CHR$", 0xC2),
    ("NOT", 0xC3), ("BIN", 0xC4), ("OR", 0xC5), ("AND", 0xC6), ("<=", 0xC7),
    (">=", 0xC8), ("<>", 0xC9), ("LINE", 0xCA), ("THEN", 0xCB), ("TO", 0xCC),
    ("STEP", 0xCD), ("DEF FN", 0xCE), ("CAT", 0xCF), ("FORMAT", 0xD0), ("MOVE", 0xD1),
    ("ERASE", 0xD2), ("OPEN #", 0xD3), ("CLOSE #", 0xD4), ("MERGE", 0xD5), ("VERIFY", 0xD6),
    ("BEEP", 0xD7), ("CIRCLE", 0xD8), ("INK", 0xD9), ("PAPER", 0xDA), ("FLASH", 0xDB),
    ("BRIGHT", 0xDC), ("INVERSE", 0xDD), ("OVER", 0xDE), ("OUT", 0xDF), ("LPRINT", 0xE0),
    ("LLIST", 0xE1), ("STOP", 0xE2), ("READ", 0xE3), ("DATA", 0xE4), ("RESTORE", 0xE5),
    ("NEW", 0xE6), ("BORDER", 0xE7), ("CONTINUE", 0xE8), ("DIM", 0xE9), ("REM", 0xEA),
    ("FOR", 0xEB), ("GO TO", 0xEC), ("GO SUB", 0xED), ("INPUT", 0xEE), ("LOAD", 0xEF),
    ("LIST", 0xF0), ("LET", 0xF1), ("PAUSE", 0xF2), ("NEXT", 0xF3), ("POKE", 0xF4),
    ("PRINT", 0xF5), ("PLOT", 0xF6), ("RUN", 0xF7), ("SAVE", 0xF8), ("RANDOMIZE", 0xF9),
    ("IF", 0xFA), ("CLS", 0xFB), ("DRAW", 0xFC), ("CLEAR", 0xFD), ("RETURN", 0xFE),
    ("COPY", 0xFF),
];

fn token_to_keyword(token: u8) -> Option<&'static str> {
    KEYWORDS.iter().find(|(_, t)| *t == token).map(|(kw, _)| *kw)
}

/// Returns the longest keyword (and its token) that `text` starts with, if any.
fn match_keyword(text: &str) -> Option<(&'static str, u8)> {
    KEYWORDS.iter()
        .filter(|(kw, _)| text.starts_with(kw))
        .max_by_key(|(kw, _)| kw.len())
        .copied()
}

/// Replaces BASIC keywords in `text` with their token bytes.
///
/// String literals (delimited by `"`) are passed through verbatim. A `REM` token, once
/// emitted, causes the remainder of the line to be copied verbatim without further
/// tokenization, matching the real interpreter's treatment of comments.
pub fn replace_keywords(text: &str) -> Result<Vec<u8>> {
    let upper = text.to_uppercase();
    let mut out = Vec::with_capacity(upper.len());
    let mut rest = upper.as_str();
    let mut in_rem = false;
    while !rest.is_empty() {
        if in_rem {
            out.extend_from_slice(rest.as_bytes());
            break;
        }
        if let Some(stripped) = rest.strip_prefix('"') {
            let end = stripped.find('"').ok_or(BasicError::UnterminatedString)?;
            out.push(b'"');
            out.extend_from_slice(stripped[..end].as_bytes());
            out.push(b'"');
            rest = &stripped[end + 1..];
            continue;
        }
        if let Some((kw, token)) = match_keyword(rest) {
            out.push(token);
            if kw == "REM" {
                in_rem = true;
            }
            rest = &rest[kw.len()..];
            continue;
        }
        let ch_len = rest.chars().next().map_or(1, |c| c.len_utf8());
        out.extend_from_slice(rest[..ch_len].as_bytes());
        rest = &rest[ch_len..];
    }
    Ok(out)
}

/// Tokenizes a single numbered program line's body (the text following the line number).
fn tokenize_line(line_number: u16, body: &str) -> Result<Vec<u8>> {
    if line_number > 9999 {
        return Err(BasicError::LineNumberOutOfRange(line_number as u32));
    }
    let tokenized = replace_keywords(body)?;
    let mut out = Vec::with_capacity(tokenized.len() + 5);
    out.extend_from_slice(&line_number.to_be_bytes());
    let length = (tokenized.len() + 1) as u16; // +1 for the trailing LINE_END
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(&tokenized);
    out.push(LINE_END);
    Ok(out)
}

/// Tokenizes a plain-text, numbered-line BASIC program into the binary format stored in
/// memory starting at `PROG` (see [inject_into_memory]).
///
/// Each input line must start with a decimal line number (0..=9999) followed by whitespace.
/// Blank lines are skipped.
pub fn tokenize_program(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let trimmed = line.trim_start();
        let digits_end = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
        if digits_end == 0 {
            return Err(BasicError::MissingLineNumber(line.to_string()));
        }
        let line_number: u16 = trimmed[..digits_end].parse()
            .map_err(|_| BasicError::LineNumberOutOfRange(u32::MAX))?;
        let body = trimmed[digits_end..].trim_start();
        out.extend(tokenize_line(line_number, body)?);
    }
    Ok(out)
}

/// Tokenizes an immediate command (no line number, no line-length header): keywords are
/// matched at word boundaries and, if the matched keyword's literal form ends in a space,
/// a single trailing space in the input is consumed along with it.
pub fn tokenize_immediate(command: &str) -> Result<Vec<u8>> {
    let upper = command.trim().to_uppercase();
    let mut out = Vec::with_capacity(upper.len());
    let mut rest = upper.as_str();
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('"') {
            let end = stripped.find('"').ok_or(BasicError::UnterminatedString)?;
            out.push(b'"');
            out.extend_from_slice(stripped[..end].as_bytes());
            out.push(b'"');
            rest = &stripped[end + 1..];
            continue;
        }
        let boundary_ok = |s: &str| {
            s.chars().next().map_or(true, |c| !c.is_ascii_alphanumeric() && c != '$')
        };
        if let Some((kw, token)) = match_keyword(rest) {
            let after = &rest[kw.len()..];
            if boundary_ok(after) {
                out.push(token);
                rest = after;
                continue;
            }
        }
        let ch_len = rest.chars().next().map_or(1, |c| c.len_utf8());
        out.extend_from_slice(rest[..ch_len].as_bytes());
        rest = &rest[ch_len..];
    }
    Ok(out)
}

/// Writes a tokenized program into memory at `prog_start` and updates the 48K system
/// variables (`PROG`, `VARS`, `E_LINE`, `WORKSP`, `STKBOT`, `STKEND`, `NXTLIN`, `CH_ADD`,
/// `ERR_NR`) so the BASIC interpreter sees a consistent, immediately RUNnable program.
pub fn inject_into_memory<M: ZxMemory>(mem: &mut M, tokenized: &[u8], prog_start: u16) {
    for (i, &byte) in tokenized.iter().enumerate() {
        mem.write(prog_start.wrapping_add(i as u16), byte);
    }
    let prog_len = tokenized.len() as u16;
    let vars_sentinel = prog_start.wrapping_add(prog_len);
    mem.write(vars_sentinel, 0x80);
    let vars_addr = vars_sentinel.wrapping_add(1);
    let e_line_addr = vars_addr.wrapping_add(1);
    mem.write(e_line_addr, LINE_END);
    mem.write(e_line_addr.wrapping_add(1), 0x80);
    let workspace_addr = e_line_addr.wrapping_add(2);

    mem.write16(SYSVAR_PROG, prog_start);
    mem.write16(SYSVAR_VARS, vars_addr);
    mem.write16(SYSVAR_E_LINE, e_line_addr);
    mem.write16(SYSVAR_WORKSP, workspace_addr);
    mem.write16(SYSVAR_STKBOT, workspace_addr);
    mem.write16(SYSVAR_STKEND, workspace_addr);
    mem.write16(SYSVAR_NXTLIN, prog_start);
    mem.write16(SYSVAR_CH_ADD, prog_start);
    mem.write(SYSVAR_ERR_NR, 0xFF);
}

/// Tokenizes `text` and injects it in one call. See [tokenize_program] and
/// [inject_into_memory].
pub fn load_program<M: ZxMemory>(mem: &mut M, text: &str, prog_start: u16) -> Result<()> {
    let tokenized = tokenize_program(text)?;
    inject_into_memory(mem, &tokenized, prog_start);
    Ok(())
}

/// Reconstructs the plain-text BASIC program currently held between `PROG` and `VARS`.
///
/// Reverses [tokenize_program]: walks line headers, reverses the keyword table, preserves
/// quoted string literals verbatim, and skips the 5-byte hidden floating-point shadow that
/// follows a [NUMBER_MARKER] byte.
pub fn extract_program<M: ZxMemory>(mem: &M) -> String {
    let prog_start = mem.read16(SYSVAR_PROG);
    let vars_addr = mem.read16(SYSVAR_VARS);
    let mut out = String::new();
    let mut addr = prog_start;
    while addr < vars_addr {
        let line_number = u16::from_be_bytes([mem.read(addr), mem.read(addr.wrapping_add(1))]);
        let length = u16::from_le_bytes([mem.read(addr.wrapping_add(2)), mem.read(addr.wrapping_add(3))]);
        let body_start = addr.wrapping_add(4);
        out.push_str(&line_number.to_string());
        out.push(' ');
        detokenize_body(mem, body_start, length, &mut out);
        out.push('\n');
        addr = body_start.wrapping_add(length);
    }
    out
}

fn detokenize_body<M: ZxMemory>(mem: &M, start: u16, length: u16, out: &mut String) {
    let mut i: u16 = 0;
    let mut in_quotes = false;
    while i < length {
        let byte = mem.read(start.wrapping_add(i));
        if byte == LINE_END {
            break;
        }
        if byte == b'"' {
            in_quotes = !in_quotes;
            out.push('"');
            i += 1;
            continue;
        }
        if !in_quotes && byte == NUMBER_MARKER {
            i += 1 + HIDDEN_NUMBER_LEN as u16;
            continue;
        }
        if !in_quotes && byte >= 0xA3 {
            if let Some(kw) = token_to_keyword(byte) {
                out.push_str(kw);
            }
        } else {
            out.push(byte as char);
        }
        i += 1;
    }
}

/// The detected BASIC/TR-DOS execution environment, used to decide how to deliver an
/// injected command (see §4.11 of the design notes for the three-tier detection rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicEnvironment {
    /// On the 128K main menu; needs navigation to a BASIC editor before injection.
    Menu128k,
    /// In the 128K BASIC editor, ready for commands.
    Basic128k,
    /// In 48K BASIC mode, ready for commands.
    Basic48k,
    /// TR-DOS is actively executing (its ROM is paged in).
    TrdosActive,
    /// TR-DOS is logically in control but is temporarily using the 48K ROM for I/O.
    TrdosViaSos,
    /// State could not be determined.
    Unknown,
}

const STUB_ADDR: u16 = 0x5CC2;
const STUB_RET: u8 = 0xC9;
const CHANS: u16 = 0x5C4F;
const CHANS_PTR: u16 = 0x5D25;
const TRDOS_TRAP_LOW: u16 = 0x3D00;
const TRDOS_TRAP_HIGH: u16 = 0x3DFF;
const EDITOR_FLAGS_ADDR: u16 = 0x5B66;

/// Detects the current BASIC/TR-DOS environment using the three-tier rule: DOS ROM paging,
/// then a stack-scan for a TR-DOS trap return address (guarded by [stack_is_sane]), then
/// plain 48K/128K ROM page disambiguation via the menu-is-up bit.
pub fn detect_environment<M: ZxMemory>(
    mem: &M, dos_rom_paged: bool, rom_page: u8, sp: u16,
) -> BasicEnvironment {
    if dos_rom_paged {
        return BasicEnvironment::TrdosActive;
    }
    if mem.read(STUB_ADDR) == STUB_RET
        && mem.read16(CHANS) == CHANS_PTR
        && stack_is_sane(mem, sp, 4)
        && stack_contains_trdos_trap(mem, sp, 16)
    {
        return BasicEnvironment::TrdosViaSos;
    }
    match rom_page {
        1 | 3 => BasicEnvironment::Basic48k,
        0 | 2 => {
            if mem.read(EDITOR_FLAGS_ADDR) & 0x02 != 0 {
                BasicEnvironment::Menu128k
            } else {
                BasicEnvironment::Basic128k
            }
        }
        _ => BasicEnvironment::Unknown,
    }
}

/// Scans up to `max_depth` stack entries above `sp` for a return address within the
/// TR-DOS trap range (`0x3D00..=0x3DFF`), indicating DOS is temporarily borrowing the 48K
/// ROM for I/O.
pub fn stack_contains_trdos_trap<M: ZxMemory>(mem: &M, sp: u16, max_depth: usize) -> bool {
    (0..max_depth as u16).any(|i| {
        let addr = sp.wrapping_add(i.wrapping_mul(2));
        let word = mem.read16(addr);
        (TRDOS_TRAP_LOW..=TRDOS_TRAP_HIGH).contains(&word)
    })
}

/// A sanity check performed before trusting a stack scan: rejects stacks with 4 or more
/// consecutive zero words, or more than one `0xFFFF` entry, either of which indicates the
/// scan has wandered into uninitialized or garbage memory rather than real return addresses.
pub fn stack_is_sane<M: ZxMemory>(mem: &M, sp: u16, check_depth: usize) -> bool {
    let mut zero_run = 0u32;
    let mut ffff_count = 0u32;
    for i in 0..check_depth as u16 {
        let word = mem.read16(sp.wrapping_add(i.wrapping_mul(2)));
        if word == 0 {
            zero_run += 1;
            if zero_run >= 4 {
                return false;
            }
        } else {
            zero_run = 0;
        }
        if word == 0xFFFF {
            ffff_count += 1;
            if ffff_count > 1 {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FlatMemory(Vec<u8>);

    impl FlatMemory {
        fn new() -> Self { FlatMemory(vec![0u8; 0x10000]) }
    }

    impl ZxMemory for FlatMemory {
        const ROM_SIZE: usize = 0x4000;
        const RAMTOP: u16 = 0xFFFF;
        const PAGES_MAX: u8 = 0;
        const SCR_BANKS_MAX: usize = 0;
        const ROM_BANKS_MAX: usize = 0;
        const RAM_BANKS_MAX: usize = 0;

        fn reset(&mut self) { self.0.iter_mut().for_each(|b| *b = 0); }
        fn read(&self, addr: u16) -> u8 { self.0[addr as usize] }
        fn read16(&self, addr: u16) -> u16 {
            let lo = self.0[addr as usize];
            let hi = self.0[addr.wrapping_add(1) as usize];
            u16::from_le_bytes([lo, hi])
        }
        fn read_screen(&self, _screen_bank: usize, addr: u16) -> u8 { self.0[addr as usize] }
        fn write(&mut self, addr: u16, val: u8) { self.0[addr as usize] = val; }
        fn write16(&mut self, addr: u16, val: u16) {
            let [lo, hi] = val.to_le_bytes();
            self.0[addr as usize] = lo;
            self.0[addr.wrapping_add(1) as usize] = hi;
        }
        fn mem_ref(&self) -> &[u8] { &self.0 }
        fn mem_mut(&mut self) -> &mut [u8] { &mut self.0 }
        fn screen_ref(&self, _screen_bank: usize) -> zxcore_core::memory::Result<&zxcore_core::memory::ScreenArray> {
            unimplemented!()
        }
        fn screen_mut(&mut self, _screen_bank: usize) -> zxcore_core::memory::Result<&mut zxcore_core::memory::ScreenArray> {
            unimplemented!()
        }
    }

    #[test]
    fn tokenizes_single_line_with_print() {
        let bytes = tokenize_program("10 PRINT \"HELLO\"\n").unwrap();
        assert_eq!(&bytes[0..2], &[0x00, 0x0A]);
        assert_eq!(bytes.iter().filter(|&&b| b == 0xF5).count(), 1);
        assert!(bytes.windows(7).any(|w| w == b"\"HELLO\""));
        assert_eq!(*bytes.last().unwrap(), LINE_END);
    }

    #[test]
    fn goto_becomes_a_single_token_with_no_ascii_go_to() {
        let bytes = tokenize_program("10 GO TO 100\n").unwrap();
        assert!(bytes.contains(&0xEC));
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("GO TO"));
    }

    #[test]
    fn round_trips_a_small_program() {
        let mut mem = FlatMemory::new();
        let src = "10 PRINT \"TEST\"\n20 LET A=10\n30 GOTO 10\n";
        load_program(&mut mem, src, DEFAULT_PROG_START).unwrap();
        let extracted = extract_program(&mem);
        assert!(extracted.contains("PRINT"));
        assert!(extracted.contains("LET"));
        assert!(extracted.contains("10 "));
        assert!(extracted.contains("20 "));
        assert!(extracted.contains("30 "));
    }

    #[test]
    fn missing_line_number_is_an_error() {
        assert!(matches!(tokenize_program("PRINT 1\n"), Err(BasicError::MissingLineNumber(_))));
    }

    #[test]
    fn stack_sanity_rejects_runs_of_zeros() {
        let mut mem = FlatMemory::new();
        mem.write16(0x8000, 0);
        mem.write16(0x8002, 0);
        mem.write16(0x8004, 0);
        mem.write16(0x8006, 0);
        assert!(!stack_is_sane(&mem, 0x8000, 4));
    }

    #[test]
    fn stack_scan_finds_trdos_trap_address() {
        let mut mem = FlatMemory::new();
        mem.write16(0x8000, 0x1234);
        mem.write16(0x8002, 0x3D50);
        assert!(stack_contains_trdos_trap(&mem, 0x8000, 4));
    }
}
