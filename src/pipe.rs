//! Bounded in-process pipe connecting pipeline stages.
//!
//! A stage graph is a chain of `Read -> Write` functions; [`spawn_stage`]
//! runs one stage on its own thread, reading from an upstream [`PipeReader`]
//! and writing to a fresh bounded [`PipeWriter`]/[`PipeReader`] pair handed
//! to the next stage. Bounded capacity keeps at most a few chunks in
//! flight, so a slow consumer applies backpressure to its producer instead
//! of the whole document being buffered (the streaming-memory invariant
//! this crate maintains throughout).

use crossbeam::channel::{self, Receiver, Sender};
use std::io::{self, Read, Write};
use std::thread::{self, JoinHandle};

/// Number of in-flight chunks a pipe will buffer before a writer blocks.
const PIPE_CAPACITY: usize = 4;
/// Size of each chunk handed across the channel.
const CHUNK_SIZE: usize = 8 * 1024;

/// The write half of a bounded pipe. Dropping it without an explicit
/// `finish()` call still closes the channel (via `Drop`), which the
/// reading side observes as end-of-stream — the cancellation path.
pub struct PipeWriter {
    tx: Sender<Vec<u8>>,
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.chunks(CHUNK_SIZE) {
            self.tx
                .send(chunk.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "pipe reader dropped"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The read half of a bounded pipe.
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for PipeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0), // sender dropped: end of stream
            }
        }
        let remaining = &self.pending[self.pos..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

/// Creates one bounded pipe.
pub fn pipe() -> (PipeWriter, PipeReader) {
    let (tx, rx) = channel::bounded(PIPE_CAPACITY);
    (
        PipeWriter { tx },
        PipeReader {
            rx,
            pending: Vec::new(),
            pos: 0,
        },
    )
}

/// Runs `stage` on its own thread, reading from `input` and writing into a
/// freshly created pipe; returns the pipe's read half for the next stage
/// to consume, plus a handle to join for propagating the stage's error.
pub fn spawn_stage<F>(mut input: impl Read + Send + 'static, stage: F) -> (PipeReader, JoinHandle<io::Result<()>>)
where
    F: FnOnce(&mut dyn Read, &mut dyn Write) -> io::Result<()> + Send + 'static,
{
    let (mut writer, reader) = pipe();
    let handle = thread::spawn(move || {
        let result = stage(&mut input, &mut writer);
        drop(writer);
        result
    });
    (reader, handle)
}
