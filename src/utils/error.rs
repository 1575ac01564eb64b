//! Error formatting utilities.

use crate::error::MprofError;

/// Format an error in a user-friendly way.
///
/// Circuit-open errors get their own wording so the user knows the profile
/// was not even tried; everything else uses the Display form.
pub fn format_error(e: &MprofError) -> String {
    match e {
        MprofError::CircuitOpen { profile, retry_at } => {
            let wait = (*retry_at - chrono::Utc::now()).num_seconds().max(0);
            format!(
                "'{}' is temporarily disabled after repeated connection failures (retry in {}s)",
                profile, wait
            )
        }
        MprofError::NotFound(msg) => format!("Not found: {}", msg),
        // Default: return the Display version (cleaner than Debug)
        other => other.to_string(),
    }
}
