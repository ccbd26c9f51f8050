//! Abort-on-failure policy for multi-process runs.
//!
//! When one rank of an MPI job dies, the others keep waiting in the next
//! collective and the job hangs until the allocation runs out. Both entry
//! points here turn a failure on any rank into an abort of every rank.

use std::fmt::Debug;
use std::io::Write;
use std::panic;
use std::sync::{Arc, Weak};

use crate::comm::Communicator;

/// Status passed to [`Communicator::abort`] on failure.
pub const ABORT_STATUS: i32 = 1;

/// Make a panic on this rank abort the whole job.
///
/// The previously installed hook runs first, so the usual panic message
/// (and backtrace, if enabled) still reaches stderr.
///
/// The hook only holds a weak handle: the owners of `world` decide when it
/// is dropped (and MPI finalized). A panic after that just reports.
pub fn install_abort_hook(world: &Arc<dyn Communicator>) {
    let world: Weak<dyn Communicator> = Arc::downgrade(world);
    let old_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        old_hook(panic_info);
        if let Some(world) = world.upgrade() {
            world.abort(ABORT_STATUS);
        }
    }));
    tracing::debug!("installed abort-on-panic hook");
}

/// Print an error the way a failing `main` does.
pub(crate) fn report_error<E: Debug>(err: &E) {
    let stderr = std::io::stderr();
    let _ = write_report(&mut stderr.lock(), err);
}

pub(crate) fn write_report<W: Write, E: Debug>(out: &mut W, err: &E) -> std::io::Result<()> {
    writeln!(out, "Error: {:?}", err)?;
    out.flush()
}
