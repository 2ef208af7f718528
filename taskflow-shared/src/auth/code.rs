/// Email verification codes
///
/// Codes are six zero-padded decimal digits drawn uniformly from
/// `[0, 1_000_000)` using the operating system's secure random source.
///
/// If the OS source fails, a code derived from the current time is used
/// instead. That fallback is NOT cryptographically secure and exists only so
/// registration keeps working on a degraded host; it is logged as a warning.

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of digits in a verification code
pub const CODE_LENGTH: usize = 6;

/// How long an issued code stays valid
pub const CODE_TTL_MINUTES: i64 = 15;

const CODE_SPACE: u32 = 1_000_000;

/// Generates a new verification code
pub fn generate_code() -> String {
    let value = match secure_value() {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Secure random source unavailable, using time-derived code");
            time_derived_value()
        }
    };

    format_code(value)
}

/// Returns true if `code` is exactly six ASCII digits
pub fn is_valid_code_format(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

fn format_code(value: u32) -> String {
    format!("{:06}", value % CODE_SPACE)
}

/// Uniform draw from the OS source using rejection sampling
fn secure_value() -> Result<u32, rand::Error> {
    let zone = u32::MAX - (u32::MAX % CODE_SPACE);
    let mut bytes = [0u8; 4];

    loop {
        OsRng.try_fill_bytes(&mut bytes)?;
        let candidate = u32::from_le_bytes(bytes);
        if candidate < zone {
            return Ok(candidate % CODE_SPACE);
        }
    }
}

fn time_derived_value() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    (nanos % u128::from(CODE_SPACE)) as u32
}
