/// Error returned by [`crate::Coalescer::run`].
#[derive(Debug)]
pub enum CoalesceError<E> {
    /// The leader's closure returned an error.
    Leader(E),
    /// The leader task was dropped before completing.
    LeaderCancelled,
    /// Missed the leader's broadcast (shouldn't happen at capacity 1).
    RecvLagged,
}

impl<E: std::fmt::Display> std::fmt::Display for CoalesceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoalesceError::Leader(e) => write!(f, "leader error: {e}"),
            CoalesceError::LeaderCancelled => write!(f, "leader was cancelled before completing"),
            CoalesceError::RecvLagged => write!(f, "missed leader result"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CoalesceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CoalesceError::Leader(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: Clone> Clone for CoalesceError<E> {
    fn clone(&self) -> Self {
        match self {
            CoalesceError::Leader(e) => CoalesceError::Leader(e.clone()),
            CoalesceError::LeaderCancelled => CoalesceError::LeaderCancelled,
            CoalesceError::RecvLagged => CoalesceError::RecvLagged,
        }
    }
}
