//! SHA-256 state hashing for the transaction log.

use sha2::{Digest, Sha256};
use suitline_core::StateView;
use tracing::error;

/// Hex SHA-256 of the view's canonical JSON (field order is declaration order)
pub fn sha256_state(view: &StateView<'_>) -> String {
    let bytes = match serde_json::to_vec(view) {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(%err, "state view did not serialize, hashing empty input");
            Vec::new()
        }
    };
    format!("{:x}", Sha256::digest(&bytes))
}
