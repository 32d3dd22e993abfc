// SPDX-License-Identifier: MPL-2.0
//! Background video decoder using FFmpeg.
//!
//! A [`DecoderSession`] owns one decode thread. The thread opens the
//! container, codec and scaler itself and drops them before it exits, so no
//! native handle ever crosses a thread boundary or outlives the join.
//!
//! The controller talks to the thread through:
//! - an unbounded command channel for seeks and speed changes, drained only
//!   between loop iterations;
//! - atomic flags for stop, play/pause and end of stream;
//! - the [`FrameQueue`], whose "not full" condition doubles as the
//!   producer's idle wait.

use crate::config::PlayerConfig;
use crate::domain::video::PlaybackSpeed;
use crate::error::VideoError;
use crate::media::video::{describe_stream, first_video_stream, open_input, VideoMetadata};
use crate::video_player::frame_queue::{DecodedFrame, FrameQueue, PushOutcome};
use crate::video_player::time_units::{bits_to_secs, pts_to_secs, secs_to_av_time, secs_to_bits};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

const THREAD_NAME: &str = "video-decoder";

/// Commands sent to the decoder thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecoderCommand {
    /// Seek to a timestamp. Frames are tagged with `epoch` from then on.
    Seek { target_secs: f64, epoch: u64 },

    /// Change the decode-side throttle.
    SetSpeed(PlaybackSpeed),
}

/// State shared between the controller and the decode thread.
#[derive(Debug)]
pub struct SessionShared {
    queue: FrameQueue,
    stop: AtomicBool,
    playing: AtomicBool,
    end_of_stream: AtomicBool,
    finished: AtomicBool,
    decoded_pts_bits: AtomicU64,
    health: Mutex<Option<VideoError>>,
}

impl SessionShared {
    fn new(queue_capacity: usize) -> Self {
        Self {
            queue: FrameQueue::new(queue_capacity),
            stop: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            end_of_stream: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            decoded_pts_bits: AtomicU64::new(secs_to_bits(0.0)),
            health: Mutex::new(None),
        }
    }

    pub fn queue(&self) -> &FrameQueue {
        &self.queue
    }

    /// Timestamp of the most recently queued frame.
    pub fn decoded_secs(&self) -> f64 {
        bits_to_secs(self.decoded_pts_bits.load(Ordering::Acquire))
    }

    /// Most recent error reported by the decode thread.
    pub fn health(&self) -> Option<VideoError> {
        self.health.lock().clone()
    }

    /// True once the decoder has drained the stream, hit a fatal error, or
    /// been stopped.
    pub fn reached_end(&self) -> bool {
        self.end_of_stream.load(Ordering::Acquire)
            || self.finished.load(Ordering::Acquire)
            || self.stop.load(Ordering::Acquire)
    }

    /// True while the decode thread is running.
    pub fn is_alive(&self) -> bool {
        !self.finished.load(Ordering::Acquire)
    }

    fn record_error(&self, err: VideoError) {
        *self.health.lock() = Some(err);
    }
}

/// Handle to a running decode thread.
///
/// Dropping the handle stops and joins the thread.
pub struct DecoderSession {
    shared: Arc<SessionShared>,
    commands: mpsc::UnboundedSender<DecoderCommand>,
    thread: Option<JoinHandle<()>>,
    info: VideoMetadata,
}

impl std::fmt::Debug for DecoderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderSession")
            .field("info", &self.info)
            .field("queue_depth", &self.shared.queue.len())
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl DecoderSession {
    /// Starts a decode thread for `path` and waits until it has opened the
    /// container, codec and scaler.
    ///
    /// The thread starts paused.
    ///
    /// # Errors
    ///
    /// Returns the open failure reported by the thread; the thread has been
    /// joined by then.
    pub fn spawn(
        path: &Path,
        config: &PlayerConfig,
        speed: PlaybackSpeed,
    ) -> Result<Self, VideoError> {
        let shared = Arc::new(SessionShared::new(config.queue_capacity));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

        let worker = DecodeWorker {
            path: path.to_path_buf(),
            shared: Arc::clone(&shared),
            commands: command_rx,
            speed,
            throttle: config.speed_throttle(),
            prebuffer_while_paused: config.prebuffer_while_paused,
            epoch: shared.queue.epoch(),
            discard_before: None,
            holding: false,
            preview: false,
            eof: false,
        };

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || worker.run(ready_tx))
            .map_err(|e| VideoError::Allocation(format!("Failed to spawn decode thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(info)) => Ok(Self {
                shared,
                commands: command_tx,
                thread: Some(thread),
                info,
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(VideoError::Decode(
                    "Decode thread exited before opening the stream".to_string(),
                ))
            }
        }
    }

    pub fn info(&self) -> &VideoMetadata {
        &self.info
    }

    pub fn shared(&self) -> &SessionShared {
        &self.shared
    }

    pub fn queue(&self) -> &FrameQueue {
        &self.shared.queue
    }

    /// Resumes or pauses decoding.
    pub fn set_playing(&self, playing: bool) {
        self.shared.playing.store(playing, Ordering::Release);
        self.shared.queue.wake_producer();
    }

    /// Drops queued frames and asks the thread to seek to `target_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`VideoError::SessionClosed`] if the thread has exited.
    pub fn seek(&self, target_secs: f64) -> Result<(), VideoError> {
        if !self.shared.is_alive() {
            return Err(VideoError::SessionClosed);
        }
        let epoch = self.shared.queue.flush();
        self.shared.end_of_stream.store(false, Ordering::Release);
        self.shared
            .decoded_pts_bits
            .store(secs_to_bits(target_secs), Ordering::Release);
        self.send(DecoderCommand::Seek { target_secs, epoch })
    }

    /// Changes the decode-side throttle.
    pub fn set_speed(&self, speed: PlaybackSpeed) -> Result<(), VideoError> {
        self.send(DecoderCommand::SetSpeed(speed))
    }

    fn send(&self, command: DecoderCommand) -> Result<(), VideoError> {
        self.commands
            .send(command)
            .map_err(|_| VideoError::SessionClosed)?;
        self.shared.queue.wake_producer();
        Ok(())
    }

    /// Stops the thread, joins it and releases queued frames.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Decode thread panicked");
            }
            log::debug!("Decode thread joined");
        }
        self.shared.queue.clear();
    }
}

impl Drop for DecoderSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Native FFmpeg state of one session.
///
/// Fields drop in declaration order: scaler, decoder, frame buffers, then
/// the container.
struct NativeSession {
    scaler: ffmpeg_next::software::scaling::Context,
    decoder: ffmpeg_next::decoder::Video,
    decoded: ffmpeg_next::frame::Video,
    /// Last frame dropped while skipping towards a seek target.
    held: ffmpeg_next::frame::Video,
    converted: ffmpeg_next::frame::Video,
    input: ffmpeg_next::format::context::Input,
    info: VideoMetadata,
    time_base: ffmpeg_next::Rational,
}

impl NativeSession {
    fn open(path: &Path) -> Result<Self, VideoError> {
        let input = open_input(path)?;
        let stream_index = first_video_stream(&input).ok_or(VideoError::NoVideoStream)?;

        let (decoder, info, time_base) = {
            let stream = input
                .stream(stream_index)
                .ok_or(VideoError::NoVideoStream)?;
            let context =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(|e| native_error(e, VideoError::Codec))?;
            let decoder = context
                .decoder()
                .video()
                .map_err(|e| native_error(e, VideoError::Codec))?;

            let width = decoder.width();
            let height = decoder.height();
            if width == 0 || height == 0 {
                return Err(VideoError::Codec(format!(
                    "Invalid video dimensions: {width}x{height}"
                )));
            }

            let info = describe_stream(&input, &stream, width, height);
            (decoder, info, stream.time_base())
        };

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            info.width,
            info.height,
            ffmpeg_next::format::Pixel::RGBA,
            info.width,
            info.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| native_error(e, VideoError::Scale))?;

        Ok(Self {
            scaler,
            decoder,
            decoded: ffmpeg_next::frame::Video::empty(),
            held: ffmpeg_next::frame::Video::empty(),
            converted: ffmpeg_next::frame::Video::empty(),
            input,
            info,
            time_base,
        })
    }
}

/// Maps an FFmpeg error, reporting out-of-memory as an allocation failure.
fn native_error(err: ffmpeg_next::Error, wrap: fn(String) -> VideoError) -> VideoError {
    match err {
        ffmpeg_next::Error::Other { errno } if errno == ffmpeg_next::util::error::ENOMEM => {
            VideoError::Allocation(err.to_string())
        }
        _ => wrap(err.to_string()),
    }
}

/// How a receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drain {
    NeedInput,
    EndOfStream,
    /// A seek or stop made further frames useless.
    Interrupted,
}

/// Decode-thread side of a session.
struct DecodeWorker {
    path: PathBuf,
    shared: Arc<SessionShared>,
    commands: mpsc::UnboundedReceiver<DecoderCommand>,
    speed: PlaybackSpeed,
    throttle: Duration,
    prebuffer_while_paused: bool,
    /// Seek epoch the next frames are tagged with.
    epoch: u64,
    /// Frames ending before this time are dropped after a seek.
    discard_before: Option<f64>,
    /// `NativeSession::held` contains a skipped frame.
    holding: bool,
    /// Decode a single frame while paused, to show a seek result.
    preview: bool,
    /// The demuxer reported end of file and the decoder was sent the flush packet.
    eof: bool,
}

impl DecodeWorker {
    fn run(mut self, ready: std_mpsc::SyncSender<Result<VideoMetadata, VideoError>>) {
        let mut native = match NativeSession::open(&self.path) {
            Ok(native) => native,
            Err(err) => {
                log::error!(
                    "Failed to open {} ({}): {}",
                    self.path.display(),
                    err.kind(),
                    err
                );
                self.shared.record_error(err.clone());
                self.shared.finished.store(true, Ordering::Release);
                let _ = ready.send(Err(err));
                return;
            }
        };

        let info = native.info;
        log::info!(
            "Opened {}: {}x{} @ {:.3} fps, {:.3}s",
            self.path.display(),
            info.width,
            info.height,
            info.fps,
            info.duration_secs
        );
        if ready.send(Ok(info)).is_err() {
            return;
        }

        if let Err(err) = self.decode_loop(&mut native) {
            log::error!("Decoding stopped ({}): {}", err.kind(), err);
            self.shared.record_error(err);
        }

        self.shared.end_of_stream.store(true, Ordering::Release);
        self.shared.finished.store(true, Ordering::Release);
        // Wake a consumer blocked in wait_for_frame.
        self.shared.queue.close();
        drop(native);
        log::debug!("Decode thread for {} exiting", self.path.display());
    }

    fn decode_loop(&mut self, native: &mut NativeSession) -> Result<(), VideoError> {
        let capacity = self.shared.queue.capacity();
        loop {
            if self.stopping() {
                return Ok(());
            }
            self.drain_commands(native);

            if self.parked_at_end() || !self.may_decode() {
                self.park(|_| self.parked_at_end() || !self.may_decode());
                continue;
            }

            if !self.eof && self.shared.queue.len() >= capacity {
                self.park(|len| len >= capacity);
                continue;
            }

            self.step(native)?;
        }
    }

    fn stopping(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    fn parked_at_end(&self) -> bool {
        self.shared.end_of_stream.load(Ordering::Acquire)
    }

    fn may_decode(&self) -> bool {
        self.preview
            || self.prebuffer_while_paused
            || self.shared.playing.load(Ordering::Acquire)
    }

    /// Blocks while `keep_waiting` holds, no command is pending and no stop
    /// was requested.
    fn park<F>(&self, keep_waiting: F)
    where
        F: Fn(usize) -> bool,
    {
        self.shared.queue.park_producer(|len| {
            !self.stopping() && self.commands.is_empty() && keep_waiting(len)
        });
    }

    fn drain_commands(&mut self, native: &mut NativeSession) {
        while let Some((target_secs, epoch)) = self.next_seek() {
            self.seek(native, target_secs, epoch);
        }
    }

    /// Applies pending speed changes up to the next seek request, in order.
    fn next_seek(&mut self) -> Option<(f64, u64)> {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                DecoderCommand::SetSpeed(speed) => {
                    log::debug!("Decode throttle speed set to {:.2}x", speed.value());
                    self.speed = speed;
                }
                DecoderCommand::Seek { target_secs, epoch } => {
                    return Some((target_secs, epoch));
                }
            }
        }
        None
    }

    /// Delay after each queued frame, none at normal speed.
    fn throttle_delay(&self) -> Option<Duration> {
        (!self.speed.is_normal()).then(|| self.speed.divide(self.throttle))
    }

    fn seek(&mut self, native: &mut NativeSession, target_secs: f64, epoch: u64) {
        self.epoch = epoch;
        self.eof = false;
        self.shared.end_of_stream.store(false, Ordering::Release);
        self.preview = !self.shared.playing.load(Ordering::Acquire);
        self.holding = false;

        let timestamp = secs_to_av_time(target_secs);
        // RangeTo lets FFmpeg land on the keyframe at or before the target.
        match native.input.seek(timestamp, ..timestamp) {
            Ok(()) => {
                native.decoder.flush();
                self.discard_before = Some(target_secs);
                log::debug!("Seeked to {:.3}s (epoch {})", target_secs, epoch);
            }
            Err(e) => {
                log::warn!("Seek to {:.3}s failed: {}", target_secs, e);
                self.shared.record_error(VideoError::Seek(e.to_string()));
                self.discard_before = None;
            }
        }
    }

    /// Reads one packet and queues every frame it produces.
    fn step(&mut self, native: &mut NativeSession) -> Result<(), VideoError> {
        if self.eof {
            return self.finish_drain(native);
        }

        let mut packet = ffmpeg_next::Packet::empty();
        match packet.read(&mut native.input) {
            Ok(()) => {
                if packet.stream() != native.info.stream_index {
                    return Ok(());
                }
                if let Err(e) = native.decoder.send_packet(&packet) {
                    log::warn!("Skipping packet rejected by decoder: {}", e);
                    return Ok(());
                }
                self.drain_frames(native).map(|_| ())
            }
            Err(ffmpeg_next::Error::Eof) => {
                self.eof = true;
                if let Err(e) = native.decoder.send_eof() {
                    log::debug!("Decoder refused flush packet: {}", e);
                }
                self.finish_drain(native)
            }
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffmpeg_next::util::error::EAGAIN => {
                Ok(())
            }
            Err(e) => Err(VideoError::Read(e.to_string())),
        }
    }

    fn finish_drain(&mut self, native: &mut NativeSession) -> Result<(), VideoError> {
        if self.drain_frames(native)? != Drain::EndOfStream {
            return Ok(());
        }
        if self.discard_before.take().is_some() && self.holding {
            // Nothing reached the seek target: show the last frame instead.
            std::mem::swap(&mut native.decoded, &mut native.held);
            self.holding = false;
            if !self.publish(native) {
                return Ok(());
            }
        }
        self.preview = false;
        self.shared.end_of_stream.store(true, Ordering::Release);
        log::info!(
            "End of stream reached at {:.3}s",
            self.shared.decoded_secs()
        );
        Ok(())
    }

    fn drain_frames(&mut self, native: &mut NativeSession) -> Result<Drain, VideoError> {
        loop {
            match native.decoder.receive_frame(&mut native.decoded) {
                Ok(()) => {
                    if !self.publish(native) {
                        return Ok(Drain::Interrupted);
                    }
                }
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    return Ok(Drain::NeedInput);
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(Drain::EndOfStream),
                Err(e) => return Err(VideoError::Decode(e.to_string())),
            }
        }
    }

    /// Converts and queues the frame in `native.decoded`.
    ///
    /// Returns false if the frame was rejected because of a seek or stop.
    fn publish(&mut self, native: &mut NativeSession) -> bool {
        let pts = native.decoded.timestamp();
        let pts_secs = pts_to_secs(
            pts,
            native.time_base.numerator(),
            native.time_base.denominator(),
        );

        if let Some(target) = self.discard_before {
            if pts_secs + native.info.frame_interval_secs() / 2.0 < target {
                // The decoder unrefs `decoded` before writing the next frame.
                std::mem::swap(&mut native.decoded, &mut native.held);
                self.holding = true;
                return true;
            }
            self.discard_before = None;
            self.holding = false;
        }

        if let Err(e) = native.scaler.run(&native.decoded, &mut native.converted) {
            log::warn!("Skipping frame at {:.3}s, scaling failed: {}", pts_secs, e);
            return true;
        }

        let frame = DecodedFrame::new(
            copy_rgba(&native.converted),
            native.info.width,
            native.info.height,
            pts,
            pts_secs,
        );

        match self.shared.queue.push(frame, self.epoch) {
            PushOutcome::Queued => {
                self.shared
                    .decoded_pts_bits
                    .store(secs_to_bits(pts_secs), Ordering::Release);
                self.preview = false;
            }
            PushOutcome::Stale | PushOutcome::Closed => return false,
        }

        if let Some(delay) = self.throttle_delay() {
            thread::sleep(delay);
        }
        true
    }
}

/// Copies RGBA pixels out of a frame, dropping the row padding.
fn copy_rgba(frame: &ffmpeg_next::frame::Video) -> Vec<u8> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let row_bytes = width * 4;
    let stride = frame.stride(0).max(row_bytes);
    let data = frame.data(0);

    let mut rgba = Vec::with_capacity(row_bytes * height);
    for row in data.chunks(stride).take(height) {
        rgba.extend_from_slice(&row[..row_bytes]);
    }
    rgba
}
