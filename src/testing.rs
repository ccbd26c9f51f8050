//! Test double standing in for a real multi-process communicator.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::comm::{check_rank, Communicator};
use crate::{Error, Result};

/// Communicator that records every call instead of talking to peers.
///
/// Messages sent to a rank can be received back from that rank, which lets
/// single-process tests drive code written for several ranks. `abort`
/// records the status and returns.
#[derive(Debug)]
pub struct RecordingCommunicator {
    size: usize,
    rank: usize,
    state: Mutex<Recorded>,
}

#[derive(Debug, Default)]
struct Recorded {
    aborts: Vec<i32>,
    barriers: usize,
    broadcasts: Vec<usize>,
    sent: Vec<(usize, Vec<u8>)>,
    inbox: HashMap<usize, VecDeque<Vec<u8>>>,
}

impl RecordingCommunicator {
    pub fn new(size: usize, rank: usize) -> Self {
        assert!(rank < size, "rank {} outside communicator of size {}", rank, size);
        Self {
            size,
            rank,
            state: Mutex::new(Recorded::default()),
        }
    }

    /// Queue a message as if `source` had sent it to this rank.
    pub fn push_incoming(&self, source: usize, data: Vec<u8>) {
        self.state.lock().inbox.entry(source).or_default().push_back(data);
    }

    /// Statuses passed to `abort`, in call order.
    pub fn aborts(&self) -> Vec<i32> {
        self.state.lock().aborts.clone()
    }

    pub fn barrier_count(&self) -> usize {
        self.state.lock().barriers
    }

    /// Roots of every broadcast, in call order.
    pub fn broadcast_roots(&self) -> Vec<usize> {
        self.state.lock().broadcasts.clone()
    }

    /// Every `(dest, payload)` pair sent so far.
    pub fn sent(&self) -> Vec<(usize, Vec<u8>)> {
        self.state.lock().sent.clone()
    }
}

impl Communicator for RecordingCommunicator {
    fn size(&self) -> usize {
        self.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn barrier(&self) -> Result<()> {
        self.state.lock().barriers += 1;
        Ok(())
    }

    fn broadcast(&self, root: usize, buf: &mut Vec<u8>) -> Result<()> {
        check_rank(root, self.size)?;
        let mut state = self.state.lock();
        state.broadcasts.push(root);
        if root != self.rank {
            if let Some(data) = state.inbox.get_mut(&root).and_then(|q| q.pop_front()) {
                *buf = data;
            }
        }
        Ok(())
    }

    fn send(&self, dest: usize, data: &[u8]) -> Result<()> {
        check_rank(dest, self.size)?;
        self.state.lock().sent.push((dest, data.to_vec()));
        Ok(())
    }

    fn receive(&self, source: usize) -> Result<Vec<u8>> {
        check_rank(source, self.size)?;
        self.state
            .lock()
            .inbox
            .get_mut(&source)
            .and_then(|q| q.pop_front())
            .ok_or_else(|| Error::Unsupported(format!("no message queued from rank {}", source)))
    }

    fn abort(&self, status: i32) {
        self.state.lock().aborts.push(status);
    }
}
