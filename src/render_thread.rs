//! Dedicated driver thread: owns the graphics driver and runs every call into it. Producers send
//! closures over a channel and block until the result comes back, so the driver never has to be
//! shared between threads.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::driver::GraphicsDriver;
use crate::error::CommandError;

type Job = Box<dyn FnOnce(&mut dyn GraphicsDriver) + Send>;

type JobResult<R> = Result<R, Box<dyn Any + Send>>;

/// Handle to the thread owning a [`GraphicsDriver`].
///
/// Dropping the handle closes the job channel and joins the thread.
#[derive(Debug)]
pub struct DriverThread {
    job_tx: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl DriverThread {
    /// Moves `driver` onto a new thread named `graphics-driver`.
    pub fn spawn<D>(driver: D) -> Result<Self, CommandError>
    where
        D: GraphicsDriver + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name("graphics-driver".to_string())
            .spawn(move || run(driver, job_rx))
            .map_err(CommandError::SpawnDriverThread)?;

        Ok(Self {
            job_tx: Some(job_tx),
            handle: Some(handle),
        })
    }

    /// Runs `job` on the driver thread and waits for its result.
    ///
    /// A panic inside `job` is resumed on the calling thread; the driver thread keeps serving.
    pub fn run<R, F>(&self, job: F) -> Result<R, CommandError>
    where
        F: FnOnce(&mut dyn GraphicsDriver) -> R + Send + 'static,
        R: Send + 'static,
    {
        let job_tx = self.job_tx.as_ref().ok_or(CommandError::DriverThreadGone)?;
        let (result_tx, result_rx) = mpsc::sync_channel::<JobResult<R>>(1);

        let job: Job = Box::new(move |driver: &mut dyn GraphicsDriver| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| job(driver)));
            let _ = result_tx.send(result);
        });
        job_tx
            .send(job)
            .map_err(|_| CommandError::DriverThreadGone)?;

        match result_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(_) => Err(CommandError::DriverThreadGone),
        }
    }

    pub fn initialize(&self) -> Result<(), CommandError> {
        self.run(|driver| driver.initialize())??;
        Ok(())
    }

    pub fn reset(&self) -> Result<(), CommandError> {
        self.run(|driver| driver.reset())??;
        Ok(())
    }

    pub fn max_image_size(&self) -> Result<u32, CommandError> {
        self.run(|driver| driver.max_image_size())
    }
}

impl Drop for DriverThread {
    fn drop(&mut self) {
        // Closing the channel ends the thread's receive loop.
        self.job_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("graphics driver thread panicked");
            }
        }
    }
}

fn run<D: GraphicsDriver>(mut driver: D, job_rx: mpsc::Receiver<Job>) {
    debug!("graphics driver thread started");
    while let Ok(job) = job_rx.recv() {
        job(&mut driver);
    }
    debug!("graphics driver thread exiting");
}
