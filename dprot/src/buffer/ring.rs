//! Fixed-capacity byte ring.
//!
//! Backs the in-memory links and the simulated serial channel. Besides the
//! usual FIFO operations it supports overwriting the oldest byte when full,
//! which is how a UART receive FIFO without flow control behaves.

/// A fixed-size ring buffer of bytes.
#[derive(Debug, Clone)]
pub struct RingBuffer<const N: usize> {
    /// The underlying storage.
    buffer: [u8; N],

    /// Read position (head).
    head: usize,

    /// Current number of bytes in buffer.
    len: usize,
}

impl<const N: usize> RingBuffer<N> {
    /// Creates a new empty ring buffer.
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; N],
            head: 0,
            len: 0,
        }
    }

    /// Returns the number of bytes in the buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the buffer is full.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.len == N
    }

    /// Returns the buffer capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the number of bytes that can be pushed without overwriting.
    #[inline]
    pub const fn remaining(&self) -> usize {
        N - self.len
    }

    /// Clears the buffer.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    #[inline]
    const fn tail(&self) -> usize {
        (self.head + self.len) % N
    }

    /// Appends a byte, handing it back if the buffer is full.
    pub fn push(&mut self, byte: u8) -> Result<(), u8> {
        if N == 0 || self.is_full() {
            return Err(byte);
        }
        let tail = self.tail();
        self.buffer[tail] = byte;
        self.len += 1;
        Ok(())
    }

    /// Appends a byte, dropping the oldest one if the buffer is full.
    ///
    /// Returns the dropped byte, if any.
    pub fn push_overwrite(&mut self, byte: u8) -> Option<u8> {
        if N == 0 {
            return Some(byte);
        }
        if self.is_full() {
            let dropped = self.buffer[self.head];
            self.buffer[self.head] = byte;
            self.head = (self.head + 1) % N;
            return Some(dropped);
        }
        let tail = self.tail();
        self.buffer[tail] = byte;
        self.len += 1;
        None
    }

    /// Removes the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.buffer[self.head];
        self.head = (self.head + 1) % N;
        self.len -= 1;
        Some(byte)
    }

    /// Returns the oldest byte without removing it.
    pub fn peek(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buffer[self.head])
        }
    }

    /// Writes as much of `data` as fits.
    ///
    /// Returns the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let mut written = 0;
        for &byte in data {
            if self.push(byte).is_err() {
                break;
            }
            written += 1;
        }
        written
    }

    /// Reads bytes into `buf`.
    ///
    /// Returns the number of bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let mut read = 0;
        while read < buf.len() {
            match self.pop() {
                Some(byte) => {
                    buf[read] = byte;
                    read += 1;
                }
                None => break,
            }
        }
        read
    }

    /// Returns contiguous slices of the stored bytes, oldest first.
    ///
    /// Since the buffer may wrap around, this returns two slices.
    /// The second slice may be empty.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.len == 0 {
            return (&[], &[]);
        }

        if self.head + self.len <= N {
            (&self.buffer[self.head..self.head + self.len], &[])
        } else {
            let first_len = N - self.head;
            let second_len = self.len - first_len;
            (&self.buffer[self.head..], &self.buffer[..second_len])
        }
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
