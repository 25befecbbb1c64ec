use std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_APPLICATION: AtomicU64 = AtomicU64::new(1);

/// Identifies a particular [`UserProcess`](crate::UserProcess) for as long as
/// the program runs. Devices key their application table by this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApplicationId(u64);

impl ApplicationId {
    /// Allocates an ID no other application has been given.
    pub(crate) fn next() -> Self {
        Self(NEXT_APPLICATION.fetch_add(1, Ordering::Relaxed))
    }

    /// Gets the underlying ID number.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<ApplicationId> for u64 {
    fn from(id: ApplicationId) -> Self {
        id.0
    }
}

impl Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
