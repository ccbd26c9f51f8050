//! Single-process stand-in used when MPI is disabled.

use super::{check_rank, Communicator};
use crate::{Error, Result};

/// Degenerate world of exactly one process.
///
/// Collectives are trivially satisfied by the only member; point-to-point
/// traffic has no peer and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeCommunicator {
    size: usize,
    rank: usize,
}

/// The process-wide fake world.
pub static FAKE_WORLD: FakeCommunicator = FakeCommunicator::new();

impl FakeCommunicator {
    pub const fn new() -> Self {
        Self { size: 1, rank: 0 }
    }
}

impl Default for FakeCommunicator {
    fn default() -> Self {
        Self::new()
    }
}

impl Communicator for FakeCommunicator {
    fn size(&self) -> usize {
        self.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn broadcast(&self, root: usize, _buf: &mut Vec<u8>) -> Result<()> {
        // The root is the only rank, so its buffer is already in place.
        check_rank(root, self.size)
    }

    fn send(&self, dest: usize, _data: &[u8]) -> Result<()> {
        check_rank(dest, self.size)?;
        Err(Error::Unsupported(
            "send on a single-process communicator has no peer".to_string(),
        ))
    }

    fn receive(&self, source: usize) -> Result<Vec<u8>> {
        check_rank(source, self.size)?;
        Err(Error::Unsupported(
            "receive on a single-process communicator has no peer".to_string(),
        ))
    }

    fn abort(&self, status: i32) {
        tracing::error!(status, "aborting single-process run");
        std::process::exit(status);
    }
}
