//! Error types for the session layer.

/// Errors that can occur while looking up a session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// No live session carries this token. Logged-out and unknown tokens
    /// are treated alike.
    #[error("session not found")]
    NotFound,
}
