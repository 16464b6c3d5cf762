//! Bounded utterance buffer for 16 kHz mono samples.
//!
//! A listening session never needs more than `max_listen_secs` of audio, so
//! the buffer is sized from that limit and drops the oldest samples once
//! full.
//!
//! ```rust
//! use kisan_mitra::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
//! assert_eq!(buf.drain(), vec![2.0, 3.0, 4.0, 5.0]);
//! ```

use std::collections::VecDeque;

/// Fixed-capacity FIFO that overwrites its oldest samples on overflow.
#[derive(Debug)]
pub struct RingBuffer {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl RingBuffer {
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer holding `secs` seconds at `sample_rate`, at least one sample.
    pub fn for_duration(secs: f32, sample_rate: u32) -> Self {
        let capacity = (secs.max(0.0) * sample_rate as f32).ceil() as usize;
        Self::new(capacity.max(1))
    }

    pub fn push_slice(&mut self, data: &[f32]) {
        // Only the newest `capacity` samples of `data` can survive.
        let data = &data[data.len().saturating_sub(self.capacity)..];
        let overflow = (self.samples.len() + data.len()).saturating_sub(self.capacity);
        self.samples.drain(..overflow);
        self.samples.extend(data.iter().copied());
    }

    /// Take every stored sample in arrival order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    /// Seconds of audio held, assuming mono at `sample_rate`.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / sample_rate as f32
    }
}
