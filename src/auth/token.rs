use rand::{rngs::OsRng, RngCore};
use tracing::error;

/// Random bytes behind every session and reset token (64 hex chars).
pub const TOKEN_BYTES: usize = 32;

const MIN_TOKEN_BYTES: usize = 16;

/// Hex-encoded token of `byte_len` bytes from the OS CSPRNG.
pub fn generate_token(byte_len: usize) -> anyhow::Result<String> {
    if byte_len < MIN_TOKEN_BYTES {
        anyhow::bail!("token length {byte_len} is below the {MIN_TOKEN_BYTES} byte minimum");
    }
    let mut bytes = vec![0u8; byte_len];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        error!(error = %e, "os rng unavailable");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(hex::encode(bytes))
}
