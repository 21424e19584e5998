use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid passcode")]
    InvalidPasscode,
}

/// Checks submitted passcodes against the configured one.
///
/// Only a SHA-256 digest of the passcode is held, and digests are compared without early exit.
#[derive(Clone)]
pub struct PasscodeGate {
    digest: [u8; 32],
}

impl std::fmt::Debug for PasscodeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasscodeGate(<redacted>)")
    }
}

fn digest(passcode: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(passcode.as_bytes()));
    out
}

impl PasscodeGate {
    pub fn new(passcode: &str) -> Self {
        Self {
            digest: digest(passcode),
        }
    }

    /// Validates a submitted passcode.
    ///
    /// Returns `Ok(())` if it matches, or `AuthError::InvalidPasscode` otherwise.
    pub fn verify(&self, candidate: &str) -> Result<(), AuthError> {
        let candidate = digest(candidate);
        let diff = self
            .digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));

        if diff == 0 {
            Ok(())
        } else {
            tracing::warn!("rejected passcode attempt");
            Err(AuthError::InvalidPasscode)
        }
    }
}
