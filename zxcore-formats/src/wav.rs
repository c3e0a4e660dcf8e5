/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
/*! A minimal, `tinywav`-compatible WAV reader/writer.

Entirely new: ported in spirit (not in code) from `core/src/3rdparty/tinywav/tinywav.cpp`
in the original C++ source. Handled directly over [Read]/[Write]/[Seek], matching the way
every other format in this crate is hand-decoded against its byte layout rather than
delegated to a format-specific crate.

A `.wav` file is a RIFF container: a 12-byte `RIFF`/size/`WAVE` header, an `fmt ` chunk
describing the PCM layout, and a `data` chunk holding the interleaved samples. [WavWriter]
always emits exactly these three chunks, in this order, with PCM or IEEE-float samples.
[WavReader] additionally tolerates and skips any other chunk that may appear between
`fmt ` and `data` (e.g. a `LIST`/`fact` chunk written by another tool).
*/
use std::io::{self, Read, Write, Seek, SeekFrom, Error, ErrorKind};

/// The `AudioFormat` field of the `fmt ` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 16-bit signed integer PCM.
    Pcm16,
    /// 32-bit IEEE-754 float PCM.
    Float32,
}

impl SampleFormat {
    fn format_tag(self) -> u16 {
        match self {
            SampleFormat::Pcm16 => 1,
            SampleFormat::Float32 => 3,
        }
    }

    fn bits_per_sample(self) -> u16 {
        match self {
            SampleFormat::Pcm16 => 16,
            SampleFormat::Float32 => 32,
        }
    }

    fn bytes_per_sample(self) -> u32 {
        self.bits_per_sample() as u32 / 8
    }

    fn from_header(format_tag: u16, bits_per_sample: u16) -> io::Result<Self> {
        match (format_tag, bits_per_sample) {
            (1, 16) => Ok(SampleFormat::Pcm16),
            (3, 32) => Ok(SampleFormat::Float32),
            _ => Err(Error::new(ErrorKind::InvalidData,
                    "WAV: unsupported AudioFormat/BitsPerSample combination")),
        }
    }
}

const RIFF_TAG: &[u8;4] = b"RIFF";
const WAVE_TAG: &[u8;4] = b"WAVE";
const FMT_TAG: &[u8;4] = b"fmt ";
const DATA_TAG: &[u8;4] = b"data";
const FMT_CHUNK_SIZE: u32 = 16;

/// Decoded `fmt ` chunk fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_format: SampleFormat,
    pub num_channels: u16,
    pub sample_rate: u32,
}

/// Streams interleaved PCM frames into a freshly created WAV file.
///
/// `chunkSize`/`dataChunkSize` are placeholders until [WavWriter::finish] rewrites them,
/// which requires the underlying writer to also implement [Seek] (a plain in-memory
/// `Vec<u8>` via [io::Cursor], or a [std::fs::File], both qualify).
pub struct WavWriter<W> {
    inner: W,
    format: WavFormat,
    frames_written: u64,
    finished: bool,
}

impl<W: Write + Seek> WavWriter<W> {
    /// Writes the RIFF/`fmt `/`data` headers (with placeholder sizes) and returns a writer
    /// ready to accept interleaved sample frames via [WavWriter::write_interleaved].
    pub fn create(mut inner: W, format: WavFormat) -> io::Result<Self> {
        inner.write_all(RIFF_TAG)?;
        inner.write_all(&0u32.to_le_bytes())?; // chunkSize, patched on finish
        inner.write_all(WAVE_TAG)?;
        inner.write_all(FMT_TAG)?;
        inner.write_all(&FMT_CHUNK_SIZE.to_le_bytes())?;
        inner.write_all(&format.sample_format.format_tag().to_le_bytes())?;
        inner.write_all(&format.num_channels.to_le_bytes())?;
        inner.write_all(&format.sample_rate.to_le_bytes())?;
        let block_align = format.num_channels as u32 * format.sample_format.bytes_per_sample();
        let byte_rate = format.sample_rate * block_align;
        inner.write_all(&byte_rate.to_le_bytes())?;
        inner.write_all(&(block_align as u16).to_le_bytes())?;
        inner.write_all(&format.sample_format.bits_per_sample().to_le_bytes())?;
        inner.write_all(DATA_TAG)?;
        inner.write_all(&0u32.to_le_bytes())?; // dataChunkSize, patched on finish
        Ok(WavWriter { inner, format, frames_written: 0, finished: false })
    }

    /// Appends `frames.len() / num_channels` interleaved frames (`Pcm16`).
    pub fn write_interleaved_i16(&mut self, frames: &[i16]) -> io::Result<()> {
        assert_eq!(self.format.sample_format, SampleFormat::Pcm16);
        for sample in frames {
            self.inner.write_all(&sample.to_le_bytes())?;
        }
        self.frames_written += (frames.len() / self.format.num_channels as usize) as u64;
        Ok(())
    }

    /// Appends `frames.len() / num_channels` interleaved frames (`Float32`).
    pub fn write_interleaved_f32(&mut self, frames: &[f32]) -> io::Result<()> {
        assert_eq!(self.format.sample_format, SampleFormat::Float32);
        for sample in frames {
            self.inner.write_all(&sample.to_le_bytes())?;
        }
        self.frames_written += (frames.len() / self.format.num_channels as usize) as u64;
        Ok(())
    }

    /// Seeks back and rewrites `chunkSize`/`dataChunkSize` with their final values.
    pub fn finish(mut self) -> io::Result<W> {
        let data_bytes = self.frames_written
            * self.format.num_channels as u64
            * self.format.sample_format.bytes_per_sample() as u64;
        let data_chunk_size = data_bytes as u32;
        let riff_chunk_size = 4 + (8 + FMT_CHUNK_SIZE) + (8 + data_chunk_size);
        self.inner.seek(SeekFrom::Start(4))?;
        self.inner.write_all(&riff_chunk_size.to_le_bytes())?;
        self.inner.seek(SeekFrom::Start(40))?;
        self.inner.write_all(&data_chunk_size.to_le_bytes())?;
        self.inner.seek(SeekFrom::End(0))?;
        self.finished = true;
        Ok(self.inner)
    }
}

impl<W> Drop for WavWriter<W> {
    fn drop(&mut self) {
        if !self.finished {
            log::warn!("WavWriter dropped without calling finish(); chunk sizes were left as placeholders");
        }
    }
}

/// A decoded WAV file: its format and the raw sample bytes of the `data` chunk, still
/// encoded per [WavFormat::sample_format].
pub struct WavFile {
    pub format: WavFormat,
    data: Vec<u8>,
}

impl WavFile {
    /// Reinterprets the `data` chunk as interleaved 16-bit PCM frames.
    pub fn as_interleaved_i16(&self) -> io::Result<Vec<i16>> {
        if self.format.sample_format != SampleFormat::Pcm16 {
            return Err(Error::new(ErrorKind::InvalidData, "WAV: not a 16-bit PCM file"));
        }
        Ok(self.data.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]])).collect())
    }

    /// Reinterprets the `data` chunk as interleaved 32-bit float frames.
    pub fn as_interleaved_f32(&self) -> io::Result<Vec<f32>> {
        if self.format.sample_format != SampleFormat::Float32 {
            return Err(Error::new(ErrorKind::InvalidData, "WAV: not a 32-bit float file"));
        }
        Ok(self.data.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect())
    }
}

/// Reads a WAV file, skipping any chunk other than `fmt `/`data` found between the RIFF
/// header and the sample data (e.g. `LIST`, `fact`).
pub fn read_wav<R: Read>(mut rd: R) -> io::Result<WavFile> {
    let mut tag4 = [0u8; 4];
    rd.read_exact(&mut tag4)?;
    if &tag4 != RIFF_TAG {
        return Err(Error::new(ErrorKind::InvalidData, "WAV: missing RIFF tag"));
    }
    let mut u32buf = [0u8; 4];
    rd.read_exact(&mut u32buf)?; // chunkSize, unused on read
    rd.read_exact(&mut tag4)?;
    if &tag4 != WAVE_TAG {
        return Err(Error::new(ErrorKind::InvalidData, "WAV: missing WAVE tag"));
    }

    let mut format: Option<WavFormat> = None;
    let mut data: Option<Vec<u8>> = None;
    while data.is_none() {
        if rd.read_exact(&mut tag4).is_err() {
            break;
        }
        rd.read_exact(&mut u32buf)?;
        let chunk_size = u32::from_le_bytes(u32buf);
        if &tag4 == FMT_TAG {
            let mut fmt = vec![0u8; chunk_size as usize];
            rd.read_exact(&mut fmt)?;
            if fmt.len() < 16 {
                return Err(Error::new(ErrorKind::InvalidData, "WAV: fmt chunk too small"));
            }
            let format_tag = u16::from_le_bytes([fmt[0], fmt[1]]);
            let num_channels = u16::from_le_bytes([fmt[2], fmt[3]]);
            let sample_rate = u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]);
            let bits_per_sample = u16::from_le_bytes([fmt[14], fmt[15]]);
            format = Some(WavFormat {
                sample_format: SampleFormat::from_header(format_tag, bits_per_sample)?,
                num_channels,
                sample_rate,
            });
        } else if &tag4 == DATA_TAG {
            let mut bytes = vec![0u8; chunk_size as usize];
            rd.read_exact(&mut bytes)?;
            data = Some(bytes);
        } else {
            io::copy(&mut (&mut rd).take(chunk_size as u64), &mut io::sink())?;
        }
        if chunk_size % 2 == 1 {
            // RIFF chunks are word-aligned; a skipped odd-length chunk leaves a pad byte.
            let mut pad = [0u8; 1];
            let _ = rd.read_exact(&mut pad);
        }
    }

    let format = format.ok_or_else(|| Error::new(ErrorKind::InvalidData, "WAV: missing fmt chunk"))?;
    let data = data.ok_or_else(|| Error::new(ErrorKind::InvalidData, "WAV: missing data chunk"))?;
    Ok(WavFile { format, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writes_and_reads_back_interleaved_float_frames_bit_exactly() {
        let format = WavFormat { sample_format: SampleFormat::Float32, num_channels: 2, sample_rate: 44100 };
        let frames: Vec<f32> = (0..4096 * 2).map(|i| (i as f32 * 0.0001).sin()).collect();
        let mut writer = WavWriter::create(Cursor::new(Vec::new()), format).unwrap();
        writer.write_interleaved_f32(&frames).unwrap();
        let cursor = writer.finish().unwrap();

        let file = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(file.format.num_channels, 2);
        assert_eq!(file.format.sample_rate, 44100);
        assert_eq!(file.format.sample_format, SampleFormat::Float32);
        let read_back = file.as_interleaved_f32().unwrap();
        assert_eq!(read_back, frames);
    }

    #[test]
    fn writes_and_reads_back_pcm16() {
        let format = WavFormat { sample_format: SampleFormat::Pcm16, num_channels: 1, sample_rate: 8000 };
        let frames: Vec<i16> = (0..1000).map(|i| i as i16).collect();
        let mut writer = WavWriter::create(Cursor::new(Vec::new()), format).unwrap();
        writer.write_interleaved_i16(&frames).unwrap();
        let cursor = writer.finish().unwrap();

        let file = read_wav(Cursor::new(cursor.into_inner())).unwrap();
        assert_eq!(file.format.sample_format, SampleFormat::Pcm16);
        assert_eq!(file.as_interleaved_i16().unwrap(), frames);
    }

    #[test]
    fn skips_unknown_chunks_between_fmt_and_data() {
        let format = WavFormat { sample_format: SampleFormat::Pcm16, num_channels: 1, sample_rate: 22050 };
        let mut writer = WavWriter::create(Cursor::new(Vec::new()), format).unwrap();
        writer.write_interleaved_i16(&[1, 2, 3]).unwrap();
        let mut buf = writer.finish().unwrap().into_inner();
        // Splice a fake "LIST" chunk in right after the fmt chunk (byte offset 36).
        let mut spliced = buf[..36].to_vec();
        spliced.extend_from_slice(b"LIST");
        spliced.extend_from_slice(&4u32.to_le_bytes());
        spliced.extend_from_slice(b"INFO");
        spliced.extend_from_slice(&buf[36..]);
        // Patch the RIFF size for the extra 12 bytes we just inserted.
        let new_riff_size = u32::from_le_bytes([spliced[4], spliced[5], spliced[6], spliced[7]]) + 12;
        spliced[4..8].copy_from_slice(&new_riff_size.to_le_bytes());
        buf = spliced;

        let file = read_wav(Cursor::new(buf)).unwrap();
        assert_eq!(file.as_interleaved_i16().unwrap(), vec![1, 2, 3]);
    }
}
