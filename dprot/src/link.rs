//! Byte link abstraction.
//!
//! This module provides the `Link` trait through which the protocol reaches
//! the physical channel one byte at a time (UART, USB CDC, a simulated
//! queue, a test script).
//!
//! # Implementations
//!
//! - `LoopbackLink`: In-memory loopback, written bytes are read back
//! - `NullLink`: Discards all writes and never yields a byte
//! - `ScriptedLink`: Pre-loaded inbound bytes, recorded outbound bytes
//! - `StdLink`: Wraps std::io Read/Write types (requires `std` feature)
//!
//! # Example
//!
//! ```rust
//! use dprot::link::{Link, LoopbackLink};
//!
//! let mut link = LoopbackLink::<64>::new();
//! link.put_byte(0x42);
//! assert_eq!(link.get_byte(), Some(0x42));
//! assert_eq!(link.get_byte(), None);
//! ```

use heapless::Vec;

use crate::buffer::RingBuffer;

/// Byte-level capabilities of the physical channel.
pub trait Link {
    /// Sends a single byte. Expected to return promptly.
    fn put_byte(&mut self, byte: u8);

    /// Blocks until a byte is available.
    ///
    /// Returns `None` only when the source is closed for good.
    fn get_byte(&mut self) -> Option<u8>;

    /// Waits at most `timeout_ms` for a byte.
    ///
    /// Returns `None` on timeout or closure. The default implementation
    /// falls back to [`get_byte`](Link::get_byte), which suits sources that
    /// never block.
    fn get_byte_timeout(&mut self, timeout_ms: u32) -> Option<u8> {
        let _ = timeout_ms;
        self.get_byte()
    }

    /// Pushes out anything buffered. Called after each complete frame.
    fn flush(&mut self) {}
}

impl<L: Link + ?Sized> Link for &mut L {
    fn put_byte(&mut self, byte: u8) {
        (**self).put_byte(byte);
    }

    fn get_byte(&mut self) -> Option<u8> {
        (**self).get_byte()
    }

    fn get_byte_timeout(&mut self, timeout_ms: u32) -> Option<u8> {
        (**self).get_byte_timeout(timeout_ms)
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

/// Which read capability a channel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Wait indefinitely for every byte.
    Blocking,

    /// Give up on a frame when a byte takes longer than this many ms.
    Timeout(u32),
}

/// A loopback link for testing.
///
/// Bytes written are immediately available to be read back. When full,
/// the oldest byte is overwritten, like an overrun UART FIFO.
#[derive(Debug)]
pub struct LoopbackLink<const N: usize> {
    buffer: RingBuffer<N>,
    overruns: usize,
}

impl<const N: usize> LoopbackLink<N> {
    /// Creates a new loopback link with the given buffer size.
    pub const fn new() -> Self {
        Self {
            buffer: RingBuffer::new(),
            overruns: 0,
        }
    }

    /// Returns the number of bytes available to read.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Returns how many bytes were lost to overwriting.
    pub fn overruns(&self) -> usize {
        self.overruns
    }

    /// Clears all buffered data.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<const N: usize> Default for LoopbackLink<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Link for LoopbackLink<N> {
    fn put_byte(&mut self, byte: u8) {
        if self.buffer.push_overwrite(byte).is_some() {
            self.overruns += 1;
        }
    }

    fn get_byte(&mut self) -> Option<u8> {
        self.buffer.pop()
    }
}

/// A null link that discards all writes and returns nothing.
///
/// Useful for checking that an operation performs no I/O.
#[derive(Debug, Default)]
pub struct NullLink {
    bytes_written: usize,
}

impl NullLink {
    /// Creates a new null link.
    pub const fn new() -> Self {
        Self { bytes_written: 0 }
    }

    /// Returns the total number of bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Resets the byte counter.
    pub fn reset(&mut self) {
        self.bytes_written = 0;
    }
}

impl Link for NullLink {
    fn put_byte(&mut self, _byte: u8) {
        self.bytes_written += 1;
    }

    fn get_byte(&mut self) -> Option<u8> {
        None
    }
}

/// A scripted link for deterministic tests.
///
/// Reads are served from up to `I` pre-loaded bytes; once they run out the
/// link behaves as timed out (or closed). Up to `O` written bytes are
/// recorded, the rest are counted as dropped.
#[derive(Debug)]
pub struct ScriptedLink<const I: usize, const O: usize> {
    inbound: RingBuffer<I>,
    outbound: Vec<u8, O>,
    dropped: usize,
    flushes: usize,
}

impl<const I: usize, const O: usize> ScriptedLink<I, O> {
    /// Creates a link with nothing to read.
    pub const fn new() -> Self {
        Self {
            inbound: RingBuffer::new(),
            outbound: Vec::new(),
            dropped: 0,
            flushes: 0,
        }
    }

    /// Creates a link that will yield `bytes`.
    pub fn with_inbound(bytes: &[u8]) -> Self {
        let mut link = Self::new();
        link.feed(bytes);
        link
    }

    /// Queues more bytes to be read.
    ///
    /// Returns the number of bytes that fit.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        self.inbound.write(bytes)
    }

    /// Returns the number of bytes still waiting to be read.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Returns everything written so far.
    pub fn sent(&self) -> &[u8] {
        &self.outbound
    }

    /// Forgets the recorded output.
    pub fn clear_sent(&mut self) {
        self.outbound.clear();
        self.dropped = 0;
    }

    /// Returns how many written bytes did not fit in the record.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Returns how many frames were flushed.
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl<const I: usize, const O: usize> Default for ScriptedLink<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const I: usize, const O: usize> Link for ScriptedLink<I, O> {
    fn put_byte(&mut self, byte: u8) {
        if self.outbound.push(byte).is_err() {
            self.dropped += 1;
        }
    }

    fn get_byte(&mut self) -> Option<u8> {
        self.inbound.pop()
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}

/// Wrapper for std::io types, e.g. an opened serial device.
///
/// Timed reads rely on the read timeout configured on the wrapped stream;
/// a `TimedOut` or `WouldBlock` error is reported as no byte.
#[cfg(feature = "std")]
#[derive(Debug)]
pub struct StdLink<T> {
    inner: T,
    write_errors: usize,
}

#[cfg(feature = "std")]
impl<T> StdLink<T> {
    /// Creates a new StdLink wrapping the given type.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            write_errors: 0,
        }
    }

    /// Returns a reference to the inner type.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Returns a mutable reference to the inner type.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consumes the wrapper and returns the inner type.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Returns how many bytes failed to be written.
    pub fn write_errors(&self) -> usize {
        self.write_errors
    }
}

#[cfg(feature = "std")]
impl<T: std::io::Read + std::io::Write> Link for StdLink<T> {
    fn put_byte(&mut self, byte: u8) {
        if let Err(e) = std::io::Write::write_all(&mut self.inner, &[byte]) {
            // Losing a byte looks like line noise to the peer
            self.write_errors += 1;
            log::warn!("StdLink write failed: {}", e);
        }
    }

    fn get_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        loop {
            match std::io::Read::read(&mut self.inner, &mut byte) {
                Ok(0) => return None,
                Ok(_) => return Some(byte[0]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                    ) =>
                {
                    return None;
                }
                Err(e) => {
                    log::warn!("StdLink read failed: {}", e);
                    return None;
                }
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = std::io::Write::flush(&mut self.inner) {
            log::warn!("StdLink flush failed: {}", e);
        }
    }
}


#[cfg(all(test, feature = "std"))]
mod std_tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::vec::Vec;

    /// Read/write double serving scripted read results.
    #[derive(Default)]
    struct Port {
        reads: VecDeque<Option<io::ErrorKind>>,
        data: VecDeque<u8>,
        written: Vec<u8>,
        fail_writes: bool,
    }

    impl io::Read for Port {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Some(kind)) => Err(io::Error::from(kind)),
                Some(None) => match self.data.pop_front() {
                    Some(byte) => {
                        buf[0] = byte;
                        Ok(1)
                    }
                    None => Ok(0),
                },
                None => Ok(0),
            }
        }
    }

    impl io::Write for Port {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_std_link_reads_and_writes() {
        let mut port = Port::default();
        port.reads.push_back(None);
        port.data.push_back(0x42);
        let mut link = StdLink::new(port);

        assert_eq!(link.get_byte(), Some(0x42));
        assert_eq!(link.get_byte(), None);

        link.put_byte(0xC0);
        link.flush();
        assert_eq!(link.inner().written, [0xC0]);
        assert_eq!(link.write_errors(), 0);
    }

    #[test]
    fn test_std_link_timeouts_yield_nothing() {
        let mut port = Port::default();
        port.reads.push_back(Some(io::ErrorKind::TimedOut));
        port.reads.push_back(Some(io::ErrorKind::WouldBlock));
        port.reads.push_back(None);
        port.data.push_back(7);
        let mut link = StdLink::new(port);

        assert_eq!(link.get_byte_timeout(10), None);
        assert_eq!(link.get_byte_timeout(10), None);
        assert_eq!(link.get_byte_timeout(10), Some(7));
    }

    #[test]
    fn test_std_link_retries_interrupted_reads() {
        let mut port = Port::default();
        port.reads.push_back(Some(io::ErrorKind::Interrupted));
        port.reads.push_back(Some(io::ErrorKind::Interrupted));
        port.reads.push_back(None);
        port.data.push_back(9);
        let mut link = StdLink::new(port);

        assert_eq!(link.get_byte(), Some(9));
        assert!(link.inner().reads.is_empty());
    }

    #[test]
    fn test_std_link_counts_failed_writes() {
        let port = Port {
            fail_writes: true,
            ..Port::default()
        };
        let mut link = StdLink::new(port);

        link.put_byte(1);
        link.put_byte(2);
        assert_eq!(link.write_errors(), 2);
        assert!(link.into_inner().written.is_empty());
    }
}
