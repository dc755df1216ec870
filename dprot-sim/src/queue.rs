//! Bounded byte queue shared between the two simulated endpoints.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use clap::ValueEnum;
use dprot::buffer::RingBuffer;

/// Largest capacity a queue can be created with.
pub const MAX_CAPACITY: usize = 4096;

/// What `push` does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OverflowPolicy {
    /// Drop the oldest byte to make room. The line loses data silently.
    #[default]
    Overwrite,
    /// Wait until the reader makes room.
    Block,
}

#[derive(Debug)]
struct State {
    buffer: RingBuffer<MAX_CAPACITY>,
    closed: bool,
    overwritten: u64,
}

/// A thread-safe FIFO of bytes standing in for one direction of a serial line.
#[derive(Debug)]
pub struct ByteQueue {
    state: Mutex<State>,
    readable: Condvar,
    writable: Condvar,
    capacity: usize,
    policy: OverflowPolicy,
}

impl ByteQueue {
    /// Creates a queue holding up to `capacity` bytes (clamped to
    /// `1..=MAX_CAPACITY`).
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(State {
                buffer: RingBuffer::new(),
                closed: false,
                overwritten: 0,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
            capacity: capacity.clamp(1, MAX_CAPACITY),
            policy,
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the overflow policy.
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Appends a byte.
    ///
    /// Returns `false` if the queue is closed, in which case the byte is
    /// discarded.
    pub fn push(&self, byte: u8) -> bool {
        let mut state = self.lock();

        while !state.closed && state.buffer.len() >= self.capacity {
            match self.policy {
                OverflowPolicy::Overwrite => {
                    state.buffer.pop();
                    state.overwritten += 1;
                }
                OverflowPolicy::Block => {
                    state = self
                        .writable
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }

        if state.closed {
            return false;
        }

        // Cannot fail, the loop above made room
        let _ = state.buffer.push(byte);
        drop(state);
        self.readable.notify_one();
        true
    }

    /// Takes a byte if one is ready.
    pub fn pop(&self) -> Option<u8> {
        let mut state = self.lock();
        let byte = state.buffer.pop();
        drop(state);
        if byte.is_some() {
            self.writable.notify_one();
        }
        byte
    }

    /// Waits for a byte. Returns `None` once the queue is closed and drained.
    pub fn pop_blocking(&self) -> Option<u8> {
        let mut state = self.lock();
        loop {
            if let Some(byte) = state.buffer.pop() {
                drop(state);
                self.writable.notify_one();
                return Some(byte);
            }
            if state.closed {
                return None;
            }
            state = self
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Waits at most `timeout` for a byte.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<u8> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if let Some(byte) = state.buffer.pop() {
                drop(state);
                self.writable.notify_one();
                return Some(byte);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            state = self
                .readable
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Marks the end of the stream and wakes every waiter.
    ///
    /// Bytes already queued can still be popped.
    pub fn close(&self) {
        self.lock().closed = true;
        self.readable.notify_all();
        self.writable.notify_all();
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns how many bytes were dropped to make room.
    pub fn overwritten(&self) -> u64 {
        self.lock().overwritten
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
