//! Per-session FIFO of output chunks awaiting application.

use std::collections::VecDeque;

/// Chunks received from the host but not yet applied and acknowledged.
#[derive(Debug, Default)]
pub struct OutputQueue {
    chunks: VecDeque<Vec<u8>>,
    queued_bytes: usize,
}

impl OutputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.queued_bytes += chunk.len();
        self.chunks.push_back(chunk);
    }

    pub fn pop(&mut self) -> Option<Vec<u8>> {
        let chunk = self.chunks.pop_front()?;
        self.queued_bytes -= chunk.len();
        Some(chunk)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queued_bytes
    }

    /// Drop everything, returning the number of bytes discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.queued_bytes;
        self.chunks.clear();
        self.queued_bytes = 0;
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_with_byte_accounting() {
        let mut queue = OutputQueue::new();
        queue.push(b"abc".to_vec());
        queue.push(Vec::new());
        queue.push(b"de".to_vec());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.queued_bytes(), 5);
        assert_eq!(queue.pop(), Some(b"abc".to_vec()));
        assert_eq!(queue.queued_bytes(), 2);
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }
}
