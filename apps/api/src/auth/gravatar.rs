use sha2::{Digest, Sha256};

/// Derives the avatar reference for an email address: a Gravatar URL over
/// the SHA-256 digest of the trimmed, lowercased address. 200px, PG-rated,
/// with the "mystery man" fallback.
pub fn avatar_url(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!(
        "https://www.gravatar.com/avatar/{}?s=200&r=pg&d=mm",
        hex::encode(digest)
    )
}
