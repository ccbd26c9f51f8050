//! rsmpi-backed world communicator.

use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, CommunicatorCollectives as _, Destination as _, Root as _, Source as _};
use mpi::Threading;

use super::{check_rank, Communicator};
use crate::{Error, Result};

/// MPI universe and its world communicator.
///
/// Dropping this value finalizes MPI.
pub struct MpiCommunicator {
    // Field order matters: the communicator handle goes before the universe.
    world: SimpleCommunicator,
    _universe: mpi::environment::Universe,
    rank: usize,
    size: usize,
}

// SAFETY: the handles are plain MPI identifiers, and `new` only succeeds when
// the library grants `Threading::Multiple`, so calls may come from any thread.
unsafe impl Send for MpiCommunicator {}
unsafe impl Sync for MpiCommunicator {}

impl MpiCommunicator {
    /// Initialize MPI and take the world communicator.
    ///
    /// Fails if MPI was already initialized in this process, or if the
    /// library cannot serve calls from several threads.
    pub fn new() -> Result<Self> {
        let (universe, provided) = mpi::initialize_with_threading(Threading::Multiple)
            .ok_or_else(|| Error::Init("MPI has already been initialized".to_string()))?;
        // An early return drops `universe`, which finalizes MPI.
        require_multiple(provided)?;

        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;

        Ok(Self {
            world,
            _universe: universe,
            rank,
            size,
        })
    }

    pub fn world(&self) -> &SimpleCommunicator {
        &self.world
    }
}

fn require_multiple(provided: Threading) -> Result<()> {
    if provided == Threading::Multiple {
        Ok(())
    } else {
        Err(Error::Init(
            "MPI library does not provide MPI_THREAD_MULTIPLE support".to_string(),
        ))
    }
}

impl Communicator for MpiCommunicator {
    fn size(&self) -> usize {
        self.size
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }

    fn broadcast(&self, root: usize, buf: &mut Vec<u8>) -> Result<()> {
        check_rank(root, self.size)?;
        let root_process = self.world.process_at_rank(root as i32);

        // Length first so receivers can size their buffers.
        let mut len = buf.len() as u64;
        root_process.broadcast_into(&mut len);
        if self.rank != root {
            buf.resize(len as usize, 0);
        }
        root_process.broadcast_into(&mut buf[..]);
        Ok(())
    }

    fn send(&self, dest: usize, data: &[u8]) -> Result<()> {
        check_rank(dest, self.size)?;
        self.world.process_at_rank(dest as i32).send(data);
        Ok(())
    }

    fn receive(&self, source: usize) -> Result<Vec<u8>> {
        check_rank(source, self.size)?;
        let (data, _status) = self.world.process_at_rank(source as i32).receive_vec::<u8>();
        Ok(data)
    }

    fn abort(&self, status: i32) {
        tracing::error!(rank = self.rank, status, "aborting MPI job");
        self.world.abort(status)
    }
}
