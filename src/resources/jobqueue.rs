//! ECS resource bridging the host with the background job thread.
//!
//! Use [`setup_job_queue`] once during initialization to spawn the job
//! thread and insert the [`JobQueue`] resource. [`JobQueue::dispose`] stops
//! the thread after the job currently running; jobs still queued are
//! dropped. Call [`shutdown_job_queue`] during teardown to also join it
//! within a deadline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use bevy_ecs::prelude::*;
use crossbeam_channel::{Sender, unbounded};
use log::info;

use crate::error::{EngineError, HandlerError};
use crate::events::job::JobCmd;
use crate::resources::worker::join_within;
use crate::systems::jobs::job_thread;

#[derive(Resource)]
pub struct JobQueue {
    /// Sender for [`JobCmd`] messages (host -> job thread).
    tx_cmd: Sender<JobCmd>,
    /// Jobs queued or running.
    pending: Arc<AtomicUsize>,
    disposed: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl JobQueue {
    pub fn spawn() -> Result<Self, EngineError> {
        let (tx_cmd, rx_cmd) = unbounded::<JobCmd>();
        let pending = Arc::new(AtomicUsize::new(0));
        let disposed = Arc::new(AtomicBool::new(false));
        let thread_pending = Arc::clone(&pending);
        let thread_disposed = Arc::clone(&disposed);
        let handle = std::thread::Builder::new()
            .name("event-jobs".into())
            .spawn(move || job_thread(rx_cmd, thread_pending, thread_disposed))
            .map_err(|e| EngineError::Worker(format!("failed to spawn job thread: {}", e)))?;
        Ok(Self {
            tx_cmd,
            pending,
            disposed,
            handle: Some(handle),
        })
    }

    /// Queue `job`; jobs run one at a time in posting order.
    pub fn post(
        &self,
        description: impl Into<String>,
        job: impl FnOnce() -> Result<(), HandlerError> + Send + 'static,
    ) -> Result<(), EngineError> {
        if self.is_disposed() {
            return Err(EngineError::Worker("job queue is disposed".into()));
        }
        self.pending.fetch_add(1, Ordering::AcqRel);
        let cmd = JobCmd::Run {
            description: description.into(),
            job: Box::new(job),
        };
        if self.tx_cmd.send(cmd).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(EngineError::Worker("job thread is not running".into()));
        }
        Ok(())
    }

    /// No job queued or running. Only a snapshot; a concurrent `post` may
    /// change the answer right after.
    pub fn is_empty(&self) -> bool {
        self.pending.load(Ordering::Acquire) == 0
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Ask the thread to stop. The running job finishes, queued jobs are
    /// skipped. Never blocks. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wakes an idle thread; ignore the error if it already exited.
        let _ = self.tx_cmd.send(JobCmd::Shutdown);
        info!("Job queue disposed");
    }

    /// Dispose and join the thread if it exits within `timeout`. Returns
    /// `false` if a job is still running at the deadline.
    pub fn shutdown_timeout(&mut self, timeout: Duration) -> bool {
        self.dispose();
        self.handle
            .take()
            .is_none_or(|handle| join_within(handle, timeout, "Job"))
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Spawn the job thread and register the [`JobQueue`] resource.
pub fn setup_job_queue(world: &mut World) -> Result<(), EngineError> {
    world.insert_resource(JobQueue::spawn()?);
    Ok(())
}

/// Dispose the job queue, join its thread within `timeout` and remove the
/// resource. Returns `false` if the thread had to be detached.
pub fn shutdown_job_queue(world: &mut World, timeout: Duration) -> bool {
    world
        .remove_resource::<JobQueue>()
        .is_none_or(|mut queue| queue.shutdown_timeout(timeout))
}
