use thiserror::Error;

pub(crate) const GENERIC_SAVE_FAILURE: &str = "Saving changes failed";

/// The single failure kind modeled at this layer: a save attempt that did
/// not settle successfully. Classifying the cause (validation, network,
/// authorization) is the save target's business, not the engine's.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SaveError {
    /// Human-readable message extracted from the save target's failure.
    pub message: String,
}

impl SaveError {
    /// Extracts a displayable message from whatever the save target
    /// returned, falling back to a generic one when there is none.
    pub(crate) fn from_failure(err: &anyhow::Error) -> Self {
        let message = err.to_string();
        Self {
            message: if message.trim().is_empty() {
                GENERIC_SAVE_FAILURE.to_string()
            } else {
                message
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_taken_from_failure() {
        let err = SaveError::from_failure(&anyhow::anyhow!("Server error"));
        assert_eq!(err.message, "Server error");
    }

    #[test]
    fn test_blank_message_falls_back_to_generic() {
        let err = SaveError::from_failure(&anyhow::anyhow!("  "));
        assert_eq!(err.message, GENERIC_SAVE_FAILURE);
    }
}
