// SPDX-License-Identifier: MPL-2.0
//! Bounded frame queue between the decode thread and the presentation pump.
//!
//! One mutex guards the frames, two condition variables signal "not full"
//! and "not empty". The producer blocks when the queue is full; the consumer
//! never blocks except in [`FrameQueue::wait_for_frame`], which is opt-in.
//!
//! Each seek advances the queue's epoch. A push tagged with an older epoch is
//! rejected, so frames decoded before a seek can never reach the display.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Represents a decoded video frame ready for display.
///
/// The pixel buffer is owned exclusively by whoever holds the frame; it is
/// moved into the queue on push and out again on pop, never shared.
#[derive(Debug, PartialEq)]
pub struct DecodedFrame {
    /// RGBA pixel data (width × height × 4 bytes, no row padding).
    rgba: Box<[u8]>,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Presentation timestamp in stream ticks, as emitted by the decoder.
    pub pts: Option<i64>,

    /// Presentation timestamp in seconds.
    pub pts_secs: f64,
}

impl DecodedFrame {
    #[must_use]
    pub fn new(rgba: Vec<u8>, width: u32, height: u32, pts: Option<i64>, pts_secs: f64) -> Self {
        Self {
            rgba: rgba.into_boxed_slice(),
            width,
            height,
            pts,
            pts_secs,
        }
    }

    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

/// Result of [`FrameQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The frame is in the queue.
    Queued,
    /// The frame belongs to a superseded seek epoch and was dropped.
    Stale,
    /// The queue is shutting down; the frame was dropped.
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<DecodedFrame>,
    epoch: u64,
    closed: bool,
}

/// Bounded FIFO of decoded frames.
#[derive(Debug)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl FrameQueue {
    /// Creates an empty queue. A capacity of 0 is raised to 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                frames: VecDeque::with_capacity(capacity),
                ..QueueState::default()
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().frames.is_empty()
    }

    /// Current seek epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Appends a frame decoded under `epoch`, blocking while the queue is full.
    ///
    /// Returns without queueing when the epoch is stale, or becomes stale
    /// while waiting, and when the queue is closed.
    pub fn push(&self, frame: DecodedFrame, epoch: u64) -> PushOutcome {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return PushOutcome::Closed;
            }
            if state.epoch != epoch {
                return PushOutcome::Stale;
            }
            if state.frames.len() < self.capacity {
                break;
            }
            self.not_full.wait(&mut state);
        }
        state.frames.push_back(frame);
        drop(state);
        self.not_empty.notify_one();
        PushOutcome::Queued
    }

    /// Removes the head frame without blocking.
    pub fn try_pop(&self) -> Option<DecodedFrame> {
        self.pop_front_if(|_| true)
    }

    /// Removes the head frame if `predicate` accepts it.
    ///
    /// The predicate runs under the queue lock and sees the same frame that
    /// is popped.
    pub fn pop_front_if<F>(&self, predicate: F) -> Option<DecodedFrame>
    where
        F: FnOnce(&DecodedFrame) -> bool,
    {
        let mut state = self.state.lock();
        let head = state.frames.front()?;
        if !predicate(head) {
            return None;
        }
        let frame = state.frames.pop_front();
        drop(state);
        self.not_full.notify_all();
        frame
    }

    /// Timestamp of the head frame in seconds.
    #[must_use]
    pub fn peek_pts_secs(&self) -> Option<f64> {
        self.state.lock().frames.front().map(|f| f.pts_secs)
    }

    /// Drops every queued frame and advances the seek epoch.
    ///
    /// Returns the new epoch. A producer blocked in [`push`](Self::push) wakes
    /// and gets [`PushOutcome::Stale`].
    pub fn flush(&self) -> u64 {
        let mut state = self.state.lock();
        state.frames.clear();
        state.epoch = state.epoch.wrapping_add(1);
        let epoch = state.epoch;
        drop(state);
        self.not_full.notify_all();
        epoch
    }

    /// Drops every queued frame without touching the epoch.
    pub fn clear(&self) {
        self.state.lock().frames.clear();
        self.not_full.notify_all();
    }

    /// Marks the queue closed and wakes every waiter on both conditions.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Blocks the producer while `keep_waiting(len)` holds.
    ///
    /// The predicate is evaluated under the queue lock, so any state change
    /// followed by [`wake_producer`](Self::wake_producer) is observed. Returns
    /// immediately once the queue is closed.
    pub fn park_producer<F>(&self, mut keep_waiting: F)
    where
        F: FnMut(usize) -> bool,
    {
        let mut state = self.state.lock();
        while !state.closed && keep_waiting(state.frames.len()) {
            self.not_full.wait(&mut state);
        }
    }

    /// Wakes a producer parked in [`push`](Self::push) or
    /// [`park_producer`](Self::park_producer).
    ///
    /// Takes the lock before notifying so a producer that has just evaluated
    /// its predicate cannot miss the signal.
    pub fn wake_producer(&self) {
        let _state = self.state.lock();
        self.not_full.notify_all();
    }

    /// Waits up to `timeout` for a frame to become available.
    ///
    /// Returns true if the queue is non-empty on return.
    pub fn wait_for_frame(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.frames.is_empty() && !state.closed {
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        !state.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn frame(pts_secs: f64) -> DecodedFrame {
        DecodedFrame::new(vec![0; 4], 1, 1, None, pts_secs)
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = FrameQueue::new(4);
        for i in 0..3 {
            assert_eq!(queue.push(frame(f64::from(i)), 0), PushOutcome::Queued);
        }
        let order: Vec<f64> = std::iter::from_fn(|| queue.try_pop())
            .map(|f| f.pts_secs)
            .collect();
        assert_eq!(order, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn try_pop_on_empty_returns_none() {
        let queue = FrameQueue::new(2);
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(FrameQueue::new(0).capacity(), 1);
    }

    #[test]
    fn push_blocks_when_full_until_pop() {
        let queue = Arc::new(FrameQueue::new(2));
        queue.push(frame(0.0), 0);
        queue.push(frame(1.0), 0);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(frame(2.0), 0))
        };

        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.len(), 2, "push must not exceed capacity");
        assert!(!producer.is_finished());

        assert!(queue.try_pop().is_some());
        assert_eq!(producer.join().expect("producer panicked"), PushOutcome::Queued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn close_unblocks_full_push() {
        let queue = Arc::new(FrameQueue::new(1));
        queue.push(frame(0.0), 0);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(frame(1.0), 0))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();

        assert_eq!(producer.join().expect("producer panicked"), PushOutcome::Closed);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn flush_rejects_frames_from_previous_epoch() {
        let queue = FrameQueue::new(4);
        queue.push(frame(0.0), 0);

        let epoch = queue.flush();
        assert_eq!(epoch, 1);
        assert!(queue.is_empty());
        assert_eq!(queue.push(frame(1.0), 0), PushOutcome::Stale);
        assert_eq!(queue.push(frame(5.0), epoch), PushOutcome::Queued);
        assert_eq!(queue.peek_pts_secs(), Some(5.0));
    }

    #[test]
    fn flush_unblocks_full_push_as_stale() {
        let queue = Arc::new(FrameQueue::new(1));
        queue.push(frame(0.0), 0);

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(frame(1.0), 0))
        };
        thread::sleep(Duration::from_millis(20));
        queue.flush();

        assert_eq!(producer.join().expect("producer panicked"), PushOutcome::Stale);
        assert!(queue.is_empty());
    }

    #[test]
    fn pop_front_if_respects_predicate() {
        let queue = FrameQueue::new(2);
        queue.push(frame(2.0), 0);

        assert!(queue.pop_front_if(|f| f.pts_secs < 1.0).is_none());
        assert_eq!(queue.len(), 1);
        assert!(queue.pop_front_if(|f| f.pts_secs > 1.0).is_some());
        assert!(queue.is_empty());
    }

    #[test]
    fn park_producer_returns_after_wake() {
        let queue = Arc::new(FrameQueue::new(2));
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(true));

        let parked = {
            let queue = Arc::clone(&queue);
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                queue.park_producer(|_| flag.load(std::sync::atomic::Ordering::SeqCst));
            })
        };
        thread::sleep(Duration::from_millis(20));
        assert!(!parked.is_finished());

        flag.store(false, std::sync::atomic::Ordering::SeqCst);
        queue.wake_producer();
        parked.join().expect("parked thread panicked");
    }

    #[test]
    fn park_producer_returns_when_closed() {
        let queue = FrameQueue::new(1);
        queue.close();
        queue.park_producer(|_| true);
        assert_eq!(queue.push(frame(0.0), 0), PushOutcome::Closed);
    }

    #[test]
    fn wait_for_frame_times_out_on_empty_queue() {
        let queue = FrameQueue::new(1);
        let start = Instant::now();
        assert!(!queue.wait_for_frame(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wait_for_frame_wakes_on_push() {
        let queue = Arc::new(FrameQueue::new(1));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(frame(0.0), 0)
            })
        };
        assert!(queue.wait_for_frame(Duration::from_secs(5)));
        producer.join().expect("producer panicked");
    }
}
