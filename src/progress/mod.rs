//! Progress reporting passed explicitly into the embedding entry point.

/// Receives human readable progress messages from the engine.
///
/// Implementations must tolerate being called from a single thread only; the
/// engine never reports from inside parallel sections.
pub trait ProgressLogger {
    fn info(&self, message: &str);

    fn debug(&self, message: &str) {
        let _ = message;
    }

    fn warning(&self, message: &str) {
        self.info(message);
    }
}

/// Forwards progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressLogger for LogProgress {
    fn info(&self, message: &str) {
        log::info!("{}", message);
    }

    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn warning(&self, message: &str) {
        log::warn!("{}", message);
    }
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressLogger for NoProgress {
    fn info(&self, _message: &str) {}

    fn warning(&self, _message: &str) {}
}
