//! Token minting

use crate::error::{CsrfError, CsrfResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;

/// Random bytes per token (128 bits)
pub const TOKEN_BYTES: usize = 16;

/// Generate a new random token string.
///
/// Reads straight from the operating system entropy source; a failure there
/// means the runtime environment is broken and is reported as
/// [`CsrfError::GenerationFailed`].
pub fn generate() -> CsrfResult<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CsrfError::GenerationFailed(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
