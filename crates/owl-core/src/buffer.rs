//! In-memory buffer of non-violating events, flushed to an append-only log.
//!
//! `record` only ever appends; `flush` only ever drains the whole buffer.
//! The drain happens under the buffer lock and the file write happens after
//! it is released, so the event loop never waits on disk I/O. A second lock
//! serializes flushers so two drains cannot land in the file out of order.
//! A write that fails partway keeps only the lines that did not reach the
//! file, so a retry never writes an event twice.

use crate::event::Event;
use crate::sink::{open_for_append, write_failed, SinkError};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered; the destination was not touched.
    Empty,
    Written(usize),
}

#[derive(Debug, Default)]
pub struct EventBuffer {
    lines: Mutex<Vec<String>>,
    flush_lock: Mutex<()>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &Event) {
        let line = event.to_log_line();
        self.lines.lock().push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }

    /// Copy of the buffered lines in insertion order.
    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn flush(&self, destination: &Path) -> Result<FlushOutcome, SinkError> {
        let _flushing = self.flush_lock.lock();
        if self.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        // Nothing is drained until the destination is open.
        let mut file = open_for_append(destination)?;
        let start = file.metadata().map(|m| m.len());

        match self.drain_into(&mut file) {
            Ok(count) => {
                debug!(
                    count,
                    destination = %destination.display(),
                    "flushed buffered events"
                );
                Ok(FlushOutcome::Written(count))
            }
            Err(partial) => {
                // Cut any torn line so the retried lines start cleanly.
                if let Ok(start) = start {
                    if let Err(e) = file.set_len(start + partial.bytes) {
                        warn!(error = %e, "cannot truncate partially written line");
                    }
                }
                warn!(
                    written = partial.lines,
                    error = %partial.error,
                    "flush failed; unwritten events kept for next attempt"
                );
                Err(write_failed(destination, partial.error))
            }
        }
    }

    /// Drains the buffer into `out` one line at a time. Lines that were not
    /// fully accepted go back to the head of the buffer. Callers hold
    /// `flush_lock`.
    fn drain_into<W: Write>(&self, out: &mut W) -> Result<usize, PartialWrite> {
        let mut drained = std::mem::take(&mut *self.lines.lock());
        let mut bytes = 0u64;
        let mut record = String::new();

        let mut written = 0;
        while written < drained.len() {
            record.clear();
            record.push_str(&drained[written]);
            record.push('\n');
            if let Err(error) = out.write_all(record.as_bytes()).and_then(|()| out.flush()) {
                self.restore(drained.split_off(written));
                return Err(PartialWrite {
                    lines: written,
                    bytes,
                    error,
                });
            }
            bytes += record.len() as u64;
            written += 1;
        }
        Ok(written)
    }

    /// Puts drained lines back ahead of anything recorded since the drain.
    fn restore(&self, mut drained: Vec<String>) {
        let mut lines = self.lines.lock();
        drained.append(&mut lines);
        *lines = drained;
    }
}

/// A write that stopped partway through a batch.
struct PartialWrite {
    /// Lines fully written before the failure.
    lines: usize,
    /// Bytes those lines occupy.
    bytes: u64,
    error: io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChangeMask, RawEvent};
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn event(mask: ChangeMask, path: &str) -> Event {
        Event::decode(&RawEvent::new(mask, path))
    }

    fn actions_and_paths(content: &str) -> Vec<(String, String)> {
        content
            .lines()
            .map(|line| {
                let fields: Vec<&str> = line.splitn(3, ", ").collect();
                (fields[1].to_string(), fields[2].to_string())
            })
            .collect()
    }

    #[test]
    fn flush_preserves_record_order() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("events.csv");
        let buffer = EventBuffer::new();
        buffer.record(&event(ChangeMask::CREATE, "/w/e1"));
        buffer.record(&event(ChangeMask::MODIFY, "/w/e2"));
        buffer.record(&event(ChangeMask::DELETE, "/w/e3"));

        assert_eq!(buffer.flush(&dest).unwrap(), FlushOutcome::Written(3));
        assert!(buffer.is_empty());
        assert_eq!(
            actions_and_paths(&fs::read_to_string(&dest).unwrap()),
            vec![
                ("CREATE".to_string(), "/w/e1".to_string()),
                ("MODIFY".to_string(), "/w/e2".to_string()),
                ("DELETE".to_string(), "/w/e3".to_string()),
            ]
        );
    }

    #[test]
    fn second_flush_is_a_no_op() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("events.csv");
        let buffer = EventBuffer::new();
        buffer.record(&event(ChangeMask::MODIFY, "/w/a"));

        assert_eq!(buffer.flush(&dest).unwrap(), FlushOutcome::Written(1));
        let after_first = fs::read_to_string(&dest).unwrap();
        assert_eq!(buffer.flush(&dest).unwrap(), FlushOutcome::Empty);
        assert_eq!(fs::read_to_string(&dest).unwrap(), after_first);
    }

    #[test]
    fn empty_flush_does_not_create_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("events.csv");
        assert_eq!(EventBuffer::new().flush(&dest).unwrap(), FlushOutcome::Empty);
        assert!(!dest.exists());
    }

    #[test]
    fn failed_flush_keeps_events_in_order() {
        let dir = tempdir().unwrap();
        let bad_dest = dir.path().join("missing").join("events.csv");
        let buffer = EventBuffer::new();
        buffer.record(&event(ChangeMask::CREATE, "/w/first"));

        assert!(buffer.flush(&bad_dest).is_err());
        buffer.record(&event(ChangeMask::CREATE, "/w/second"));

        let lines = buffer.snapshot();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("/w/first"));
        assert!(lines[1].ends_with("/w/second"));

        let dest = dir.path().join("events.csv");
        assert_eq!(buffer.flush(&dest).unwrap(), FlushOutcome::Written(2));
    }

    /// Accepts `budget` bytes, then fails the way a full disk does.
    struct CappedWriter {
        data: Vec<u8>,
        budget: usize,
    }

    impl Write for CappedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "file too large"));
            }
            let n = buf.len().min(self.budget);
            self.data.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failure_midway_retries_only_unwritten_lines() {
        let buffer = EventBuffer::new();
        let padding = "x".repeat(200);
        let paths: Vec<String> = (0..200).map(|i| format!("/w/{i:03}/{padding}")).collect();
        for path in &paths {
            buffer.record(&event(ChangeMask::MODIFY, path));
        }

        let mut out = CappedWriter {
            data: Vec::new(),
            budget: 16 * 1024,
        };
        let partial = buffer
            .drain_into(&mut out)
            .err()
            .expect("write should stop partway");
        assert!(partial.lines > 0 && partial.lines < paths.len());
        assert_eq!(buffer.len(), paths.len() - partial.lines);
        // The torn line is past the committed prefix.
        assert!(out.data.len() as u64 > partial.bytes);

        out.data.truncate(partial.bytes as usize);
        out.budget = usize::MAX;
        assert_eq!(
            buffer.drain_into(&mut out).ok(),
            Some(paths.len() - partial.lines)
        );
        assert!(buffer.is_empty());

        let written: Vec<String> = actions_and_paths(&String::from_utf8(out.data).unwrap())
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        assert_eq!(written, paths);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_failure_on_full_device_keeps_every_event() {
        let buffer = EventBuffer::new();
        buffer.record(&event(ChangeMask::CREATE, "/w/a"));
        buffer.record(&event(ChangeMask::DELETE, "/w/b"));

        let err = buffer.flush(Path::new("/dev/full")).unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));
        let lines = buffer.snapshot();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(", CREATE, /w/a"));
        assert!(lines[1].ends_with(", DELETE, /w/b"));
    }

    #[test]
    fn concurrent_records_and_flushes_lose_nothing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("events.csv");
        let buffer = Arc::new(EventBuffer::new());

        let writer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    buffer.record(&event(ChangeMask::MODIFY, &format!("/w/{i}")));
                }
            })
        };
        for _ in 0..20 {
            buffer.flush(&dest).unwrap();
        }
        writer.join().unwrap();
        buffer.flush(&dest).unwrap();

        let paths: Vec<String> = actions_and_paths(&fs::read_to_string(&dest).unwrap())
            .into_iter()
            .map(|(_, path)| path)
            .collect();
        let expected: Vec<String> = (0..500).map(|i| format!("/w/{i}")).collect();
        assert_eq!(paths, expected);
    }
}
