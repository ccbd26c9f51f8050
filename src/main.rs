//! pixell-mpi - demo driver
//!
//! Runs the same program as a single process (`DISABLE_MPI=1`) or under
//! `mpirun`. `--fail` returns an error from rank 0 and `--panic` panics on
//! rank 0, to show the whole job being torn down.

use anyhow::{bail, Context};
use pixell_mpi::MpiContext;

fn main() -> anyhow::Result<()> {
    pixell_mpi::init_logging();

    let ctx = MpiContext::from_env().context("failed to set up the communicator")?;
    let fail = std::env::args().any(|arg| arg == "--fail");
    let panic = std::env::args().any(|arg| arg == "--panic");

    let result = ctx.run(|ctx| -> anyhow::Result<()> {
        let mode = if ctx.disabled() { "single-process" } else { "MPI" };
        println!("rank {} of {} ({})", ctx.rank(), ctx.size(), mode);

        let greeting = ctx.broadcast(&format!("hello from rank 0 of {}", ctx.size()), 0)?;
        if ctx.rank() != 0 {
            println!("rank {} got: {}", ctx.rank(), greeting);
        }

        if ctx.rank() == 0 && panic {
            panic!("requested panic on rank 0");
        }
        if ctx.rank() == 0 && fail {
            bail!("requested failure on rank 0");
        }

        if let Some(total) = ctx.reduce(ctx.rank() as u64, |a, b| a + b, 0)? {
            println!("sum of ranks: {}", total);
        }

        ctx.barrier()?;
        Ok(())
    });

    // `run` already printed the error.
    if result.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
