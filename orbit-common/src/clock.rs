use std::time::{Duration, SystemTime};

/// Source of "now" for session expiry and token caching.
///
/// Tests pin it with [`Clock::new_with_fixed_time`] so that expiry decisions
/// do not depend on the wall clock.
#[derive(Debug, Clone)]
pub struct Clock {
    pub fixed_time: Option<SystemTime>,
}

impl Clock {
    pub fn new() -> Self {
        Self { fixed_time: None }
    }

    pub fn new_with_fixed_time(fixed_time: SystemTime) -> Self {
        Self {
            fixed_time: Some(fixed_time),
        }
    }

    pub fn now(&self) -> SystemTime {
        self.fixed_time.unwrap_or_else(SystemTime::now)
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed_time.is_some()
    }

    /// The instant `duration` from now.
    pub fn deadline_after(&self, duration: Duration) -> SystemTime {
        self.now() + duration
    }

    /// True once `deadline` is not in the future anymore.
    pub fn has_passed(&self, deadline: SystemTime) -> bool {
        self.now() >= deadline
    }

    /// A copy of a fixed clock moved forward by `duration`.
    /// A real clock is returned unchanged.
    pub fn advanced_by(&self, duration: Duration) -> Self {
        Self {
            fixed_time: self.fixed_time.map(|t| t + duration),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
