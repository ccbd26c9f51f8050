//! Communicator abstraction over the process group.
//!
//! Only the handful of operations the pipelines actually use are exposed.
//! Everything moves as byte buffers; typed helpers live on
//! [`MpiContext`](crate::MpiContext).

mod fake;
#[cfg(feature = "mpi")]
mod world;

pub use fake::{FakeCommunicator, FAKE_WORLD};
#[cfg(feature = "mpi")]
pub use world::MpiCommunicator;

use crate::{Error, Result};

/// A group of cooperating processes.
///
/// Implementations must be shareable across threads so the abort hook can
/// hold on to the communicator for the lifetime of the process.
pub trait Communicator: Send + Sync {
    /// Number of processes in the group.
    fn size(&self) -> usize;

    /// Zero-based index of this process in the group.
    fn rank(&self) -> usize;

    /// Block until every process in the group has reached the barrier.
    fn barrier(&self) -> Result<()>;

    /// Replace `buf` on every rank with the contents of `buf` on `root`.
    ///
    /// Buffer lengths may differ between ranks on entry; on return every
    /// rank holds exactly the root's bytes.
    fn broadcast(&self, root: usize, buf: &mut Vec<u8>) -> Result<()>;

    /// Blocking send of `data` to `dest`.
    fn send(&self, dest: usize, data: &[u8]) -> Result<()>;

    /// Blocking receive of the next message from `source`.
    fn receive(&self, source: usize) -> Result<Vec<u8>>;

    /// Terminate every process in the group with `status`.
    ///
    /// Real communicators do not return from this call. Test doubles may,
    /// so callers must not rely on divergence for correctness.
    fn abort(&self, status: i32);
}

/// Ensure `rank` addresses a process of a group of `size`.
pub(crate) fn check_rank(rank: usize, size: usize) -> Result<()> {
    if rank < size {
        Ok(())
    } else {
        Err(Error::InvalidRank { rank, size })
    }
}
