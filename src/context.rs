//! Process context: the selected world communicator plus typed helpers.

use std::fmt::Debug;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::abort::{self, ABORT_STATUS};
use crate::comm::{Communicator, FAKE_WORLD};
use crate::config::{Mode, MpiConfig};
use crate::{Error, Result};

/// Communication context for one process of a (possibly single-process) job.
///
/// Built once at startup and passed by reference to whatever needs to know
/// its rank or talk to other ranks.
#[derive(Clone)]
pub struct MpiContext {
    world: Arc<dyn Communicator>,
    mode: Mode,
}

impl MpiContext {
    /// Select the world from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&MpiConfig::load()?)
    }

    /// Select the world according to `config`.
    ///
    /// On the real path MPI is initialized and the abort hook installed. If
    /// MPI cannot be brought up the error is returned as is; there is no
    /// fallback to the single-process world.
    pub fn from_config(config: &MpiConfig) -> Result<Self> {
        Self::from_config_with(config, open_world)
    }

    /// Like [`from_config`](Self::from_config), with `open` bringing up the
    /// multi-process world. `open` is only called on the real path.
    pub fn from_config_with<F>(config: &MpiConfig, open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Arc<dyn Communicator>>,
    {
        let ctx = match config.mode() {
            Mode::Disabled => Self::fake(),
            Mode::Real => {
                let ctx = Self::with_world(open()?);
                ctx.install_abort_hook();
                ctx
            }
        };

        tracing::info!(
            disabled = ctx.disabled(),
            rank = ctx.rank(),
            size = ctx.size(),
            "selected communicator"
        );
        Ok(ctx)
    }

    /// Single-process context backed by [`FAKE_WORLD`].
    pub fn fake() -> Self {
        Self {
            world: Arc::new(FAKE_WORLD),
            mode: Mode::Disabled,
        }
    }

    /// Multi-process context over an existing communicator.
    ///
    /// Does not install the abort hook; call
    /// [`install_abort_hook`](Self::install_abort_hook) for that.
    pub fn with_world(world: Arc<dyn Communicator>) -> Self {
        Self {
            world,
            mode: Mode::Real,
        }
    }

    /// Install the abort-on-panic hook for this world.
    ///
    /// Does nothing and returns `false` for a disabled context, since there
    /// is nobody to coordinate with.
    pub fn install_abort_hook(&self) -> bool {
        if self.disabled() {
            return false;
        }
        abort::install_abort_hook(&self.world);
        true
    }

    pub fn world(&self) -> &Arc<dyn Communicator> {
        &self.world
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// True when running on the single-process stand-in.
    pub fn disabled(&self) -> bool {
        self.mode.is_disabled()
    }

    pub fn rank(&self) -> usize {
        self.world.rank()
    }

    pub fn size(&self) -> usize {
        self.world.size()
    }

    /// Run the program body, aborting the whole job if it fails.
    ///
    /// An error is printed to stderr exactly as a failing `main` would print
    /// it. In multi-process mode every rank is then aborted with status 1.
    /// The error is returned only when the abort does not terminate the
    /// process, which is the case in single-process mode.
    pub fn run<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        E: Debug,
        F: FnOnce(&Self) -> std::result::Result<T, E>,
    {
        let result = f(self);
        if let Err(err) = &result {
            abort::report_error(err);
            if !self.disabled() {
                tracing::error!(rank = self.rank(), "unhandled error, aborting all ranks");
                self.world.abort(ABORT_STATUS);
            }
        }
        result
    }

    /// Barrier synchronization
    pub fn barrier(&self) -> Result<()> {
        self.world.barrier()
    }

    /// Broadcast `data` from `root` to all ranks.
    ///
    /// Every rank gets back the root's value; the argument is ignored on the
    /// other ranks.
    pub fn broadcast<T: Serialize + DeserializeOwned>(&self, data: &T, root: usize) -> Result<T> {
        let mut buffer = if self.rank() == root {
            bincode::serialize(data)?
        } else {
            Vec::new()
        };

        self.world.broadcast(root, &mut buffer)?;

        Ok(bincode::deserialize(&buffer)?)
    }

    /// Send data to specific rank
    pub fn send<T: Serialize>(&self, data: &T, dest: usize) -> Result<()> {
        let serialized = bincode::serialize(data)?;
        self.world.send(dest, &serialized)
    }

    /// Receive data from specific rank
    pub fn receive<T: DeserializeOwned>(&self, source: usize) -> Result<T> {
        let buffer = self.world.receive(source)?;
        Ok(bincode::deserialize(&buffer)?)
    }

    /// Reduce operation across all ranks.
    ///
    /// Values are folded with `op` in rank order on `root`, which gets
    /// `Some(result)`; every other rank gets `None`.
    pub fn reduce<T, F>(&self, local_value: T, op: F, root: usize) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(T, T) -> T,
    {
        if root >= self.size() {
            return Err(Error::InvalidRank { rank: root, size: self.size() });
        }

        if self.rank() != root {
            self.send(&local_value, root)?;
            return Ok(None);
        }

        let mut local_value = Some(local_value);
        let mut result: Option<T> = None;
        for rank in 0..self.size() {
            let value = if rank == root {
                local_value.take()
            } else {
                Some(self.receive(rank)?)
            };
            if let Some(value) = value {
                result = Some(match result {
                    Some(acc) => op(acc, value),
                    None => value,
                });
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for MpiContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpiContext")
            .field("mode", &self.mode)
            .field("rank", &self.rank())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(feature = "mpi")]
fn open_world() -> Result<Arc<dyn Communicator>> {
    Ok(Arc::new(crate::comm::MpiCommunicator::new()?))
}

#[cfg(not(feature = "mpi"))]
fn open_world() -> Result<Arc<dyn Communicator>> {
    Err(Error::Unavailable)
}
