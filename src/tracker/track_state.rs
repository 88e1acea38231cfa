/// Lifecycle phase of a keypoint tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackPhase {
    /// No `init` call has succeeded yet
    #[default]
    Uninitialized,
    /// Templates exist but no search has run since the last `init`
    Initialized,
    /// At least one `run` has succeeded since the last `init`
    Tracking,
}
