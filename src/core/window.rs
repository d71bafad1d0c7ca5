use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Local, TimeDelta};

/// Time range during which the device should be active.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Window {
    /// Inclusive.
    pub start: DateTime<Local>,

    /// Exclusive.
    pub stop: DateTime<Local>,
}

impl Debug for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.stop)
    }
}

impl Window {
    pub fn contains(self, at: DateTime<Local>) -> bool {
        (self.start <= at) && (at < self.stop)
    }

    pub fn duration(self) -> TimeDelta {
        self.stop - self.start
    }
}

/// All windows decided for one day, ordered by ascending start.
///
/// Built fresh each scheduling cycle and discarded once the day's timers are
/// armed, never persisted.
#[derive(Clone, Debug, derive_more::Deref, derive_more::IntoIterator)]
pub struct Plan(Vec<Window>);

impl Plan {
    pub(crate) fn new(windows: Vec<Window>) -> Self {
        Self(windows)
    }
}
