//! For tracking frame preparation and aborting early

#[cfg(feature = "pbr")]
use pbr::ProgressBar;

/// A trait that is used to report progress to some consumer.
pub trait ProgressReporter: Send {
    /// Called after each frame has been encoded.
    ///
    /// This method may return `false` to abort processing.
    fn increase(&mut self) -> bool;

    /// Called once all frames are ready to be shown
    fn done(&mut self, _msg: &str) {}
}

/// No-op progress reporter
pub struct NoProgress {}

impl ProgressReporter for NoProgress {
    fn increase(&mut self) -> bool {
        true
    }
}

/// Implement the progress reporter trait for a progress bar,
/// to make it usable for frame encoding reporting.
#[cfg(feature = "pbr")]
impl<T> ProgressReporter for ProgressBar<T> where T: std::io::Write + Send {
    fn increase(&mut self) -> bool {
        self.inc();
        true
    }

    fn done(&mut self, msg: &str) {
        self.finish_print(msg);
    }
}
