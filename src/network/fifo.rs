//! Byte FIFO between an interrupt handler and the poll loop.
//!
//! A UART receive interrupt pushes bytes through a [`FifoProducer`]; the poll
//! loop reads them back through a [`FifoStream`], which pairs the consumer
//! half with the transmit side of the same peripheral and so implements
//! [`Connection`](super::Connection).
//!
//! When the queue is full the newest byte is dropped and counted.
//!
//! ```rust
//! use mqtt_rpc::network::fifo::ByteFifo;
//!
//! let mut fifo: ByteFifo<8> = ByteFifo::new();
//! let (mut producer, mut consumer) = fifo.split();
//! assert!(producer.push(0x30));
//! assert_eq!(consumer.pop(), Some(0x30));
//! assert_eq!(consumer.pop(), None);
//! ```

use super::{Close, Connection, Read, Write};
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};
use heapless::spsc::{Consumer, Producer, Queue};

/// Single-producer single-consumer byte queue holding up to `N - 1` bytes.
pub struct ByteFifo<const N: usize> {
    queue: Queue<u8, N>,
    dropped: AtomicUsize,
}

impl<const N: usize> ByteFifo<N> {
    /// Create an empty FIFO.
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Split into the interrupt-side producer and the poll-side consumer.
    pub fn split(&mut self) -> (FifoProducer<'_, N>, FifoConsumer<'_, N>) {
        let (producer, consumer) = self.queue.split();
        (
            FifoProducer {
                inner: producer,
                dropped: &self.dropped,
            },
            FifoConsumer { inner: consumer },
        )
    }
}

impl<const N: usize> fmt::Debug for ByteFifo<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteFifo")
            .field("len", &self.queue.len())
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

impl<const N: usize> Default for ByteFifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writing half of a [`ByteFifo`], used from interrupt context.
pub struct FifoProducer<'a, const N: usize> {
    inner: Producer<'a, u8, N>,
    dropped: &'a AtomicUsize,
}

impl<const N: usize> FifoProducer<'_, N> {
    /// Queue one byte. Returns `false` and counts the byte as dropped when
    /// the queue is full.
    pub fn push(&mut self, byte: u8) -> bool {
        match self.inner.enqueue(byte) {
            Ok(()) => true,
            Err(_) => {
                // Only the producer writes this counter.
                let dropped = self.dropped.load(Ordering::Relaxed);
                self.dropped
                    .store(dropped.wrapping_add(1), Ordering::Relaxed);
                false
            }
        }
    }

    /// Number of bytes dropped because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Reading half of a [`ByteFifo`], used from the poll loop.
pub struct FifoConsumer<'a, const N: usize> {
    inner: Consumer<'a, u8, N>,
}

impl<const N: usize> FifoConsumer<'_, N> {
    /// Take the oldest byte, if any.
    pub fn pop(&mut self) -> Option<u8> {
        self.inner.dequeue()
    }

    /// Number of bytes waiting.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` when no bytes are waiting.
    pub fn is_empty(&self) -> bool {
        !self.inner.ready()
    }
}

/// A connection whose receive side is a [`FifoConsumer`] and whose transmit
/// side is any [`Write`] + [`Close`] implementation.
pub struct FifoStream<'a, W, const N: usize> {
    rx: FifoConsumer<'a, N>,
    tx: W,
}

impl<'a, W, const N: usize> FifoStream<'a, W, N> {
    /// Pair a FIFO consumer with a transmitter.
    pub fn new(rx: FifoConsumer<'a, N>, tx: W) -> Self {
        Self { rx, tx }
    }

    /// Give back both halves.
    pub fn into_parts(self) -> (FifoConsumer<'a, N>, W) {
        (self.rx, self.tx)
    }
}

impl<W, const N: usize> Read for FifoStream<'_, W, N> {
    type Error = core::convert::Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl<W: Write, const N: usize> Write for FifoStream<'_, W, N> {
    type Error = W::Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.tx.write(buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.tx.flush()
    }
}

impl<W: Close, const N: usize> Close for FifoStream<'_, W, N> {
    type Error = W::Error;

    fn close(self) -> Result<(), Self::Error> {
        self.tx.close()
    }
}

impl<W: Write + Close, const N: usize> Connection for FifoStream<'_, W, N> {}
