/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of ZXCORE, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Runs an [EmulatorContext] on a dedicated thread at the Spectrum's native frame rate,
//! double-buffering the rendered video frame and feeding a band-limited audio carousel,
//! grounded on [crate::chip::ThreadSyncTimer] and [crate::audio::carousel] the way the
//! `sdl2-zxspectrum` front-end example paces and consumes them.
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::audio::carousel::{create_carousel, AudioFrameConsumer, AudioFrameProducer};
use crate::audio::synth::BandLimited;
use crate::audio::{BlepAmpFilter, BlepStereo};
use crate::chip::ThreadSyncTimer;
use crate::machine::{Chipset, ConfigError, EmulatorContext, MachineConfig};
use crate::video::BorderSize;

/// The BLEP stack every [Scheduler] renders into: a mono band-limited synthesizer, split into
/// stereo by [BlepStereo] (channel 2, used for the EAR/MIC mix, is panned into both 0 and 1;
/// the AY's own three channels render directly into 0/1/"2"), trimmed by [BlepAmpFilter] to
/// leave headroom when both sources are active at once. Matches the `sdl2-zxspectrum` front-end
/// example's `BlepAmpFilter::build(0.25)(BlepStereo::build(0.86)(BandLimited::new(2)))` stack.
type SchedulerBlep = BlepAmpFilter<BlepStereo<BandLimited<f32>>>;

fn new_blep() -> SchedulerBlep {
    BlepAmpFilter::build(0.25)(BlepStereo::build(0.86)(BandLimited::new(2)))
}

/// The EAR/MIC channel samples are rendered to before [BlepStereo] pans them across 0 and 1.
const EARMIC_CHANNEL: usize = 2;

struct AudioEngine {
    blep: SchedulerBlep,
    producer: AudioFrameProducer<f32>,
    sample_rate: u32,
}

/// A double-buffered RGBA8 framebuffer, sized once at [Scheduler::new] time.
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameBuffer {
    fn new(border_size: BorderSize) -> Self {
        let (width, height) = Chipset::render_size(border_size);
        FrameBuffer { data: vec![0u8; width as usize * height as usize * 4], width, height }
    }
}

/// The run state a [Scheduler]'s worker thread reacts to. Transitions are driven by
/// [Scheduler::pause]/[Scheduler::resume]/[Scheduler::stop] and observed under the condvar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
    Stopped,
}

struct Shared {
    state: Mutex<RunState>,
    condvar: Condvar,
    frame: Mutex<FrameBuffer>,
    border_size: BorderSize,
}

impl Shared {
    /// Blocks while paused, returning the state that ended the wait (`Running` or `Stopped`).
    fn wait_while_paused(&self) -> RunState {
        let mut state = self.state.lock().unwrap();
        while *state == RunState::Paused {
            state = self.condvar.wait(state).unwrap();
        }
        *state
    }

    fn set_state(&self, next: RunState) {
        *self.state.lock().unwrap() = next;
        self.condvar.notify_all();
    }
}

/// Owns an [EmulatorContext] and, once started, a thread driving it at the host frame rate.
///
/// The worker thread renders video into the shared [FrameBuffer] and audio into the carousel
/// each frame; [Scheduler::with_frame] and [Scheduler::audio_consumer] are how a front-end
/// reads the results back out.
pub struct Scheduler {
    shared: Arc<Shared>,
    audio_consumer: AudioFrameConsumer<f32>,
    worker: Option<JoinHandle<(EmulatorContext, AudioEngine)>>,
    // Kept on the main side while no worker is running, so synchronous single-stepping
    // (step_instruction/step_frame/direct_read/...) stays available between start_async calls.
    context: Option<EmulatorContext>,
    audio: Option<AudioEngine>,
}

/// A snapshot of one rendered video frame, borrowed from the [Scheduler]'s [FrameBuffer].
pub struct FrameView<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl Scheduler {
    /// Builds a scheduler around a freshly initialized [EmulatorContext], starting paused.
    ///
    /// `sample_rate` is the host audio sample rate in Hz, used only to size the audio
    /// carousel's frame buffers; `border_size` fixes the rendered video frame's dimensions for
    /// the scheduler's lifetime.
    pub fn new(config: &MachineConfig, sample_rate: u32, border_size: BorderSize) -> Result<Self, ConfigError> {
        let context = EmulatorContext::init(config)?;
        let frame_samples = (sample_rate as usize / 50).max(1);
        let (producer, consumer) = create_carousel::<f32>(3, frame_samples, 2);
        let audio = AudioEngine { blep: new_blep(), producer, sample_rate };
        let shared = Arc::new(Shared {
            state: Mutex::new(RunState::Paused),
            condvar: Condvar::new(),
            frame: Mutex::new(FrameBuffer::new(border_size)),
            border_size,
        });
        Ok(Scheduler {
            shared,
            audio_consumer: consumer,
            worker: None,
            context: Some(context),
            audio: Some(audio),
        })
    }

    /// `true` while a worker thread owns the [EmulatorContext] (between [Scheduler::start_async]
    /// and [Scheduler::stop]).
    pub fn is_running_async(&self) -> bool {
        self.worker.is_some()
    }

    /// Runs the emulator on the calling thread until [Scheduler::stop] is called from another
    /// thread.
    pub fn start_sync(&mut self) {
        self.shared.set_state(RunState::Running);
        let context = self.context.as_mut().expect("EmulatorContext missing: an async worker is running");
        let audio = self.audio.as_mut().expect("AudioEngine missing: an async worker is running");
        let mut timer = ThreadSyncTimer::new(context.chipset.frame_duration_nanos());
        loop {
            if let RunState::Stopped = self.shared.wait_while_paused() {
                break;
            }
            run_one_frame(context, audio, &self.shared);
            let _ = timer.synchronize_thread_to_frame();
        }
    }

    /// Runs exactly `n` frames synchronously on the calling thread, ignoring pause/stop state.
    /// Intended for deterministic tests and headless batch rendering.
    pub fn run_frames_sync(&mut self, n: u32) {
        let context = self.context.as_mut().expect("EmulatorContext missing: an async worker is running");
        let audio = self.audio.as_mut().expect("AudioEngine missing: an async worker is running");
        for _ in 0..n {
            run_one_frame(context, audio, &self.shared);
        }
    }

    /// Spawns a worker thread that owns the [EmulatorContext] and runs it at the host frame
    /// rate until [Scheduler::stop] is called. Panics if a worker is already running.
    pub fn start_async(&mut self) {
        let mut context = self.context.take().expect("EmulatorContext missing: an async worker is already running");
        let mut audio = self.audio.take().expect("AudioEngine missing: an async worker is already running");
        self.shared.set_state(RunState::Running);
        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || {
            let mut timer = ThreadSyncTimer::new(context.chipset.frame_duration_nanos());
            loop {
                if let RunState::Stopped = shared.wait_while_paused() {
                    break;
                }
                run_one_frame(&mut context, &mut audio, &shared);
                let _ = timer.synchronize_thread_to_frame();
            }
            (context, audio)
        }));
    }

    /// Pauses a running scheduler (sync or async) without tearing down its worker thread.
    pub fn pause(&self) {
        self.shared.set_state(RunState::Paused);
    }

    /// Resumes a paused scheduler.
    pub fn resume(&self) {
        self.shared.set_state(RunState::Running);
    }

    /// Stops the scheduler, joining the worker thread (if [Scheduler::start_async] was used)
    /// and reclaiming ownership of the [EmulatorContext] so synchronous control/debug methods
    /// become available again via [Scheduler::context]/[Scheduler::context_mut].
    pub fn stop(&mut self) {
        self.shared.set_state(RunState::Stopped);
        if let Some(worker) = self.worker.take() {
            if let Ok((context, audio)) = worker.join() {
                self.context = Some(context);
                self.audio = Some(audio);
            }
        }
    }

    /// Read-only access to the [EmulatorContext], available whenever no async worker owns it.
    pub fn context(&self) -> Option<&EmulatorContext> {
        self.context.as_ref()
    }

    /// Mutable access to the [EmulatorContext], available whenever no async worker owns it.
    pub fn context_mut(&mut self) -> Option<&mut EmulatorContext> {
        self.context.as_mut()
    }

    /// Borrows the most recently rendered video frame.
    pub fn with_frame<R>(&self, f: impl FnOnce(FrameView<'_>) -> R) -> R {
        let frame = self.shared.frame.lock().unwrap();
        f(FrameView { data: &frame.data, width: frame.width, height: frame.height })
    }

    /// The audio consumer side of the carousel; a playback backend pulls rendered samples
    /// from this on its own thread.
    pub fn audio_consumer(&mut self) -> &mut AudioFrameConsumer<f32> {
        &mut self.audio_consumer
    }
}

fn run_one_frame(context: &mut EmulatorContext, audio: &mut AudioEngine, shared: &Shared) {
    let budget = context.chipset.frame_tstates();
    context.tape_tick(budget);
    let _ = context.step_frame();
    {
        let mut frame = shared.frame.lock().unwrap();
        context.chipset.render_video_frame(&mut frame.data, shared.border_size);
    }
    render_audio_frame(context, audio);
}

/// Renders the frame just executed into `audio`'s BLEP and pushes the resulting stereo samples
/// into the carousel, following the `sdl2-zxspectrum` front-end's
/// `render_audio`/`sum_iter`/`next_frame`/`send_frame` sequence.
fn render_audio_frame(context: &mut EmulatorContext, audio: &mut AudioEngine) {
    let frame_sample_count =
        context.chipset.render_audio(&mut audio.blep, audio.sample_rate, EARMIC_CHANNEL);
    let blep = &mut audio.blep;
    audio.producer.render_frame(|vec| {
        vec.clear();
        let sample_iter = blep.sum_iter::<f32>(0).zip(blep.sum_iter::<f32>(1));
        vec.extend(sample_iter.take(frame_sample_count).flat_map(|(l, r)| [l, r]));
    });
    blep.next_frame();
    let _ = audio.producer.send_frame();
}

impl EmulatorContext {
    /// Feeds the emulated EAR input from the tape deck for roughly one frame's worth of
    /// T-states, advancing the deck's playback position (or its idle-noise generator).
    fn tape_tick(&mut self, frame_tstates: u32) {
        let mut remaining = frame_tstates as i64;
        while remaining > 0 {
            let pulse = self.tape.next_pulse();
            self.chipset.feed_ear_in(pulse);
            remaining -= pulse.get() as i64;
        }
    }
}
