//! Background job thread.
//!
//! [`job_thread`] runs on its own OS thread and executes
//! [`JobCmd::Run`](crate::events::job::JobCmd::Run) closures one at a time,
//! in the order they were posted. A failing or panicking job is logged and
//! the thread moves on to the next one. Once the queue is disposed the
//! remaining jobs are dropped unrun.
//!
//! See also: [`crate::resources::jobqueue`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::Receiver;
use log::{debug, error, info};

use crate::error::panic_message;
use crate::events::job::JobCmd;

/// Entry point of the job thread. Blocks until the queue is disposed or
/// every sender is gone.
pub fn job_thread(rx_cmd: Receiver<JobCmd>, pending: Arc<AtomicUsize>, disposed: Arc<AtomicBool>) {
    info!(
        "Job thread starting (id={:?})",
        std::thread::current().id()
    );
    for cmd in rx_cmd.iter() {
        if disposed.load(Ordering::Acquire) {
            let skipped = std::iter::once(cmd)
                .chain(rx_cmd.try_iter())
                .filter(|cmd| matches!(cmd, JobCmd::Run { .. }))
                .count();
            if skipped > 0 {
                pending.fetch_sub(skipped, Ordering::AcqRel);
                info!("Dropping {} queued job(s) on dispose", skipped);
            }
            break;
        }
        match cmd {
            JobCmd::Run { description, job } => {
                debug!("Running job '{}'", description);
                match panic::catch_unwind(AssertUnwindSafe(job)) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Job '{}' failed: {}", description, e),
                    Err(payload) => error!(
                        "Job '{}' panicked: {}",
                        description,
                        panic_message(payload.as_ref())
                    ),
                }
                pending.fetch_sub(1, Ordering::AcqRel);
            }
            JobCmd::Shutdown => break,
        }
    }
    info!("Job thread exiting");
}
