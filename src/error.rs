use fantoccini::error::{CmdError, NewSessionError};
use thiserror::Error;

/// Run-terminating faults. Everything recoverable (a stale item, a missing
/// field, a sink hiccup) is handled where it happens and never surfaces
/// here.
#[derive(Debug, Error)]
pub enum RunError {
    /// No WebDriver session could be opened at all.
    #[error("failed to open WebDriver session: {0}")]
    Connect(#[from] NewSessionError),

    /// A page never produced its grid or no-results marker, even after the
    /// challenge-mediated retry. A dead page cannot self-recover, so this
    /// ends the run.
    #[error("page {page} never became ready")]
    PageLoad { page: u32 },

    /// The browser session itself died. Aggressive bot defenses terminating
    /// the browser is the dominant real-world failure mode; partial results
    /// are preserved by the caller.
    #[error("browser session lost on page {page}: {source}")]
    Session {
        page: u32,
        #[source]
        source: CmdError,
    },

    /// The next-page control existed but could not be activated.
    #[error("failed to advance past page {page}: {source}")]
    Navigation {
        page: u32,
        #[source]
        source: CmdError,
    },
}

/// Faults while reading a single product node.
#[derive(Debug, Error)]
pub enum ExtractFault {
    /// The node went invalid mid-read (concurrent re-render). Skips this
    /// one item; the rest of the page continues.
    #[error("product node went stale mid-read")]
    Stale,

    /// The session died underneath the extractor; escalated to a
    /// [`RunError::Session`] by the caller.
    #[error("session fault during extraction: {0}")]
    Session(#[source] CmdError),
}

/// True when the error indicates the WebDriver session itself is gone
/// (crashed browser, dropped connection), as opposed to a failed command
/// against a live session.
pub fn is_session_fault(err: &CmdError) -> bool {
    if matches!(err, CmdError::Lost(_)) {
        return true;
    }
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("invalid session id")
        || msg.contains("disconnected")
        || msg.contains("connection closed")
}

/// True when an element handle went stale underneath a read.
pub fn is_stale(err: &CmdError) -> bool {
    err.to_string().to_ascii_lowercase().contains("stale element")
}
