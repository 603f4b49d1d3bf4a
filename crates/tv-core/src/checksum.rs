//! Field-wise SHA-256 hashing for track metadata.

use sha2::{Digest, Sha256};

/// Hex SHA-256 over `fields`, each terminated by a unit separator.
///
/// The separator keeps `("ab", "c")` and `("a", "bc")` distinct.
pub fn compute_checksum<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "checksum_test.rs"]
mod tests;
