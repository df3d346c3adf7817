//! Utility functions
//!
//! **Why**: Centralized helpers used across multiple modules
//!
//! **Used by**: app controller (time labels), CLI summary

/// Time label formatting
pub mod time {
    /// Format seconds as `MM:SS` using rounded seconds.
    ///
    /// Minutes do not roll over into hours (`3600` gives `"60:00"`).
    /// Negative or non-finite input formats as `"00:00"`.
    pub fn time_length(seconds: f64) -> String {
        let total = if seconds.is_finite() && seconds > 0.0 {
            seconds.round() as u64
        } else {
            0
        };
        format!("{:02}:{:02}", total / 60, total % 60)
    }

}

pub use time::time_length;
