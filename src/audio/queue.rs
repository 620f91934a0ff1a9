//! Bounded hand-off queue between the audio callback and the capture worker.
//!
//! The cpal callback runs under real-time constraints: it may take one short
//! lock and push, but it must never block on a full queue or on downstream
//! work.  [`ChunkQueue`] therefore **drops the oldest chunk** when capacity is
//! reached, so the producer always succeeds in bounded time and memory stays
//! bounded when the consumer falls behind.
//!
//! Dropped chunks are tallied per *overflow episode*: an episode opens on the
//! first drop and closes on the next push that does not drop (or when the
//! queue is closed).  The consumer collects the whole episode as a single
//! count via [`ChunkQueue::take_drop_report`], so a multi-second stall
//! produces one report, not one per chunk.
//!
//! # Example
//!
//! ```rust
//! use audio_assistant::audio::{AudioChunk, ChunkQueue, Pop};
//!
//! let queue = ChunkQueue::new(2);
//! for seq in 0..3 {
//!     queue.push(AudioChunk { seq, samples: vec![0.0; 160], sample_rate: 16_000 });
//! }
//! // Capacity 2: chunk 0 was dropped, 1 and 2 survive in order.
//! assert!(matches!(queue.try_pop(), Pop::Chunk(c) if c.seq == 1));
//! assert!(matches!(queue.try_pop(), Pop::Chunk(c) if c.seq == 2));
//! ```

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// One block of mono audio as produced by the capture callback.
///
/// Samples are `f32` in `[-1.0, 1.0]`, already downmixed to mono at the
/// device's native rate.  `seq` increases strictly within a capture session
/// and lets the consumer verify that no reordering occurred.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Session-unique, strictly increasing sequence number.
    pub seq: u64,
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Rate the samples were captured at, in Hz.
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1_000 / self.sample_rate as u64
    }
}

// ---------------------------------------------------------------------------
// Pop
// ---------------------------------------------------------------------------

/// Outcome of a pop attempt.
#[derive(Debug)]
pub enum Pop {
    /// The oldest queued chunk.
    Chunk(AudioChunk),
    /// Nothing available within the wait window; the queue is still open.
    Empty,
    /// The queue is closed and fully drained.
    Closed,
}

// ---------------------------------------------------------------------------
// ChunkQueue
// ---------------------------------------------------------------------------

struct Inner {
    buf: VecDeque<AudioChunk>,
    /// Chunks dropped in the currently open overflow episode.
    episode_dropped: u64,
    episode_open: bool,
    /// Completed episode counts not yet collected by the consumer.
    pending_report: Option<u64>,
    closed: bool,
}

/// Bounded FIFO of [`AudioChunk`]s with drop-oldest overflow.
///
/// `push` never blocks beyond the internal lock; `pop_timeout` parks the
/// consumer on a condvar until a chunk arrives, the timeout lapses, or the
/// queue is closed.  [`close`](Self::close) wakes all waiting consumers and
/// makes further pushes no-ops, while already-queued chunks remain poppable
/// (stop must drain, not discard).
pub struct ChunkQueue {
    inner: Mutex<Inner>,
    available: Condvar,
    capacity: usize,
}

impl ChunkQueue {
    /// Create a queue holding at most `capacity` chunks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ChunkQueue capacity must be > 0");
        Self {
            inner: Mutex::new(Inner {
                buf: VecDeque::with_capacity(capacity),
                episode_dropped: 0,
                episode_open: false,
                pending_report: None,
                closed: false,
            }),
            available: Condvar::new(),
            capacity,
        }
    }

    /// Enqueue `chunk`, dropping the oldest queued chunk when full.
    ///
    /// Returns `false` (chunk discarded) once the queue has been closed.
    /// Safe to call from the audio callback: the critical section is a few
    /// deque operations, never a wait.
    pub fn push(&self, chunk: AudioChunk) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return false;
        }

        let mut dropped_now = false;
        if inner.buf.len() >= self.capacity {
            inner.buf.pop_front();
            inner.episode_dropped += 1;
            inner.episode_open = true;
            dropped_now = true;
        }

        // A push that fits without dropping ends the current episode.
        if !dropped_now && inner.episode_open {
            Self::seal_episode(&mut inner);
        }

        inner.buf.push_back(chunk);
        drop(inner);
        self.available.notify_one();
        true
    }

    /// Pop the oldest chunk, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Pop {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();

        loop {
            if let Some(chunk) = inner.buf.pop_front() {
                return Pop::Chunk(chunk);
            }
            if inner.closed {
                return Pop::Closed;
            }

            let now = Instant::now();
            if now >= deadline {
                return Pop::Empty;
            }

            let (guard, wait) = self
                .available
                .wait_timeout(inner, deadline - now)
                .unwrap();
            inner = guard;

            if wait.timed_out() {
                return match inner.buf.pop_front() {
                    Some(chunk) => Pop::Chunk(chunk),
                    None if inner.closed => Pop::Closed,
                    None => Pop::Empty,
                };
            }
        }
    }

    /// Pop without waiting. `Closed` is only returned once the queue is both
    /// closed and drained, so shutdown paths can drain with this.
    pub fn try_pop(&self) -> Pop {
        let mut inner = self.inner.lock().unwrap();
        match inner.buf.pop_front() {
            Some(chunk) => Pop::Chunk(chunk),
            None if inner.closed => Pop::Closed,
            None => Pop::Empty,
        }
    }

    /// Close the queue: wakes all waiting consumers, rejects further pushes,
    /// and seals any open overflow episode so its count is not lost.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        if inner.episode_open {
            Self::seal_episode(&mut inner);
        }
        drop(inner);
        self.available.notify_all();
    }

    /// Collect the drop count of completed overflow episodes, if any.
    ///
    /// Consecutive uncollected episodes accumulate into one count.
    pub fn take_drop_report(&self) -> Option<u64> {
        self.inner.lock().unwrap().pending_report.take()
    }

    /// Number of chunks currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().buf.len()
    }

    /// Returns `true` when no chunks are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of queued chunks before overflow dropping starts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn seal_episode(inner: &mut Inner) {
        let total = inner.episode_dropped + inner.pending_report.unwrap_or(0);
        inner.pending_report = Some(total);
        inner.episode_dropped = 0;
        inner.episode_open = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(seq: u64) -> AudioChunk {
        AudioChunk {
            seq,
            samples: vec![0.0; 160],
            sample_rate: 16_000,
        }
    }

    // ---- FIFO ordering -------------------------------------------------------

    #[test]
    fn pops_in_push_order() {
        let q = ChunkQueue::new(8);
        for seq in 0..5 {
            assert!(q.push(chunk(seq)));
        }

        for expected in 0..5 {
            match q.try_pop() {
                Pop::Chunk(c) => assert_eq!(c.seq, expected),
                other => panic!("expected chunk {expected}, got {other:?}"),
            }
        }
        assert!(matches!(q.try_pop(), Pop::Empty));
    }

    // ---- Overflow ---------------------------------------------------------------

    #[test]
    fn overflow_drops_oldest_first() {
        let q = ChunkQueue::new(4);
        for seq in 0..10 {
            q.push(chunk(seq));
        }

        // 0..=5 were dropped; the newest 4 remain in order.
        assert_eq!(q.len(), 4);
        for expected in 6..10 {
            match q.try_pop() {
                Pop::Chunk(c) => assert_eq!(c.seq, expected),
                other => panic!("expected chunk {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn overflow_episode_reported_once() {
        let q = ChunkQueue::new(2);
        // Consumer paused: 5 pushes into capacity 2 drop 3 chunks.
        for seq in 0..5 {
            q.push(chunk(seq));
        }
        // Episode still open — nothing to report yet.
        assert_eq!(q.take_drop_report(), None);

        // Consumer resumes, making room; the next push closes the episode.
        let _ = q.try_pop();
        q.push(chunk(5));

        assert_eq!(q.take_drop_report(), Some(3));
        // Exactly one report for the whole episode.
        assert_eq!(q.take_drop_report(), None);
    }

    #[test]
    fn uncollected_episodes_accumulate() {
        let q = ChunkQueue::new(2);
        q.push(chunk(0));
        q.push(chunk(1));
        q.push(chunk(2)); // drops 0

        let _ = q.try_pop();
        q.push(chunk(3)); // closes first episode (1 drop)

        q.push(chunk(4)); // drops again (queue holds 2)
        let _ = q.try_pop();
        q.push(chunk(5)); // closes second episode (1 drop)

        assert_eq!(q.take_drop_report(), Some(2));
    }

    #[test]
    fn close_seals_open_episode() {
        let q = ChunkQueue::new(2);
        for seq in 0..6 {
            q.push(chunk(seq));
        }
        assert_eq!(q.take_drop_report(), None);

        q.close();
        assert_eq!(q.take_drop_report(), Some(4));
    }

    // ---- Close semantics ----------------------------------------------------

    #[test]
    fn push_after_close_is_rejected() {
        let q = ChunkQueue::new(2);
        q.close();
        assert!(!q.push(chunk(0)));
        assert!(q.is_empty());
    }

    #[test]
    fn queued_chunks_survive_close() {
        let q = ChunkQueue::new(4);
        q.push(chunk(0));
        q.push(chunk(1));
        q.close();

        assert!(matches!(q.try_pop(), Pop::Chunk(c) if c.seq == 0));
        assert!(matches!(q.try_pop(), Pop::Chunk(c) if c.seq == 1));
        assert!(matches!(q.try_pop(), Pop::Closed));
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        use std::sync::Arc;

        let q = Arc::new(ChunkQueue::new(2));
        let q2 = Arc::clone(&q);

        let consumer = std::thread::spawn(move || {
            let start = Instant::now();
            let result = q2.pop_timeout(Duration::from_secs(10));
            (result, start.elapsed())
        });

        std::thread::sleep(Duration::from_millis(50));
        q.close();

        let (result, elapsed) = consumer.join().unwrap();
        assert!(matches!(result, Pop::Closed));
        assert!(
            elapsed < Duration::from_secs(5),
            "consumer was not woken by close(): waited {elapsed:?}"
        );
    }

    #[test]
    fn pop_timeout_returns_empty_without_producer() {
        let q = ChunkQueue::new(2);
        let result = q.pop_timeout(Duration::from_millis(20));
        assert!(matches!(result, Pop::Empty));
    }

    #[test]
    fn pop_timeout_receives_pushed_chunk() {
        use std::sync::Arc;

        let q = Arc::new(ChunkQueue::new(2));
        let q2 = Arc::clone(&q);

        let consumer =
            std::thread::spawn(move || q2.pop_timeout(Duration::from_secs(5)));

        std::thread::sleep(Duration::from_millis(20));
        q.push(chunk(42));

        match consumer.join().unwrap() {
            Pop::Chunk(c) => assert_eq!(c.seq, 42),
            other => panic!("expected chunk, got {other:?}"),
        }
    }

    // ---- Misc ---------------------------------------------------------------

    #[test]
    fn chunk_duration_ms() {
        let c = AudioChunk {
            seq: 0,
            samples: vec![0.0; 4_800],
            sample_rate: 48_000,
        };
        assert_eq!(c.duration_ms(), 100);
    }

    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
        assert_send::<ChunkQueue>();
    }

    #[test]
    #[should_panic(expected = "ChunkQueue capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ = ChunkQueue::new(0);
    }
}
