//! Discord event handlers
//!
//! Gateway events and the periodic voice sweep feed activity into the
//! currency service. Failures on these paths are logged and dropped; they
//! never interrupt message handling and never reach users.

/// Gateway event dispatch (chat messages)
pub mod events;
/// Periodic voice-presence rewards
pub mod voice;
