//! Progress reporting for multi-stage operations.
//!
//! ```
//! use convexuv::algo::Progress;
//!
//! let progress = Progress::new(|stage, total, name| {
//!     eprintln!("[{}/{}] {}", stage, total, name);
//! });
//! progress.report(0, 2, "triangulating convex hull");
//! ```

use std::fmt;

/// Callback receiving `(current, total, message)` updates.
///
/// `current` counts completed steps, so the last report of an operation has
/// `current == total`.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a progress reporter from a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// A reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_progress_forwards_updates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |current, total, message| {
            sink.lock().unwrap().push((current, total, message.to_string()));
        });

        progress.report(0, 2, "first");
        progress.report(2, 2, "done");
        Progress::none().report(1, 1, "ignored");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (2, 2, "done".to_string()));
    }
}
