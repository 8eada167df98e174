use crate::driver::DriverError;

/// Errors returned by queue operations that reach the graphics driver.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("graphics driver error: {0}")]
    Driver(#[from] DriverError),
    /// A command referenced an image whose creation has not been executed by the driver.
    #[error("image {0} has no driver resource")]
    UnrealizedImage(u64),
    /// A command referenced a shader whose creation has not been executed by the driver.
    #[error("shader {0} has no driver resource")]
    UnrealizedShader(u64),
    #[error("the graphics driver thread has shut down")]
    DriverThreadGone,
    #[error("failed to spawn the graphics driver thread")]
    SpawnDriverThread(#[source] std::io::Error),
}
