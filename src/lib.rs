//! # pixell-mpi - Safer MPI bootstrap for scientific pipelines
//!
//! Programs built on this crate run unchanged as a single process or as an
//! MPI job. At startup an [`MpiContext`] is built from the environment:
//!
//! - `DISABLE_MPI=true` (or `1`, any case) selects a fake single-process
//!   world with size 1 and rank 0, and never touches the MPI library.
//! - Anything else selects the real MPI world communicator and installs a
//!   panic hook that aborts every rank of the job when one rank fails.
//!
//! ```no_run
//! use pixell_mpi::MpiContext;
//!
//! fn main() -> Result<(), pixell_mpi::Error> {
//!     let ctx = MpiContext::from_env()?;
//!     ctx.run(|ctx| {
//!         println!("rank {} of {}", ctx.rank(), ctx.size());
//!         ctx.barrier()
//!     })
//! }
//! ```

pub mod abort;
pub mod comm;
pub mod config;
pub mod context;
pub mod testing;

pub use abort::install_abort_hook;
pub use comm::{Communicator, FakeCommunicator, FAKE_WORLD};
#[cfg(feature = "mpi")]
pub use comm::MpiCommunicator;
pub use config::{Mode, MpiConfig, DISABLE_MPI_VAR};
pub use context::MpiContext;

/// Install the stderr `tracing` subscriber used by the binary and examples.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Main error type for pixell-mpi operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("MPI initialization failed: {0}")]
    Init(String),

    #[error("MPI support is not available in this build (rebuild with the `mpi` feature or set DISABLE_MPI=1)")]
    Unavailable,

    #[error("rank {rank} is out of range for a communicator of size {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
