//! Messages for the background job thread.
//!
//! Jobs are closures posted by the host (e.g. a cutscene step that must not
//! hold up the frame). They run in FIFO order on a dedicated thread, see
//! [`crate::resources::jobqueue`].

use std::fmt;

use crate::error::HandlerError;

pub type JobFn = Box<dyn FnOnce() -> Result<(), HandlerError> + Send + 'static>;

pub enum JobCmd {
    /// Run `job`; `description` is used in log messages.
    Run { description: String, job: JobFn },
    /// Wake the job thread so it notices the queue was disposed.
    Shutdown,
}

impl fmt::Debug for JobCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobCmd::Run { description, .. } => f
                .debug_struct("Run")
                .field("description", description)
                .finish_non_exhaustive(),
            JobCmd::Shutdown => f.write_str("Shutdown"),
        }
    }
}
