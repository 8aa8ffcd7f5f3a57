//! Chunked transfer helpers shared by the backends.

use bytes::Bytes;

use crate::traits::{ProgressCallback, TransferSnapshot, TransferState};

/// Split `data` into zero-copy slices of at most `chunk_size` bytes.
///
/// An empty payload yields no chunks.
pub fn chunked(data: &Bytes, chunk_size: usize) -> impl Iterator<Item = Bytes> + '_ {
    let chunk_size = chunk_size.max(1);
    (0..data.len())
        .step_by(chunk_size)
        .map(move |start| data.slice(start..(start + chunk_size).min(data.len())))
}

/// Tracks bytes sent for one transfer and reports snapshots to the callback.
pub struct ProgressReporter<'a> {
    total_bytes: u64,
    bytes_transferred: u64,
    on_progress: ProgressCallback<'a>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(total_bytes: u64, on_progress: ProgressCallback<'a>) -> Self {
        Self {
            total_bytes,
            bytes_transferred: 0,
            on_progress,
        }
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn advance(&mut self, chunk_len: usize) {
        self.bytes_transferred = (self.bytes_transferred + chunk_len as u64).min(self.total_bytes);
        self.emit(TransferState::Running);
    }

    pub fn succeed(&self) {
        (self.on_progress)(TransferSnapshot::new(
            self.total_bytes,
            self.total_bytes,
            TransferState::Success,
        ));
    }

    pub fn fail(&self) {
        self.emit(TransferState::Error);
    }

    fn emit(&self, state: TransferState) {
        (self.on_progress)(TransferSnapshot::new(
            self.bytes_transferred,
            self.total_bytes,
            state,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_chunked_covers_payload() {
        let data = Bytes::from(vec![7u8; 10]);
        let chunks: Vec<_> = chunked(&data, 4).collect();
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![4, 4, 2]);
        assert_eq!(chunked(&Bytes::new(), 4).count(), 0);
    }

    #[test]
    fn test_reporter_sequence() {
        let seen = Mutex::new(Vec::new());
        let callback = |s: TransferSnapshot| seen.lock().unwrap().push(s);
        let mut reporter = ProgressReporter::new(6, &callback);
        reporter.advance(4);
        reporter.advance(4);
        reporter.succeed();

        let seen = seen.into_inner().unwrap();
        assert_eq!(
            seen,
            vec![
                TransferSnapshot::new(4, 6, TransferState::Running),
                TransferSnapshot::new(6, 6, TransferState::Running),
                TransferSnapshot::new(6, 6, TransferState::Success),
            ]
        );
    }
}
