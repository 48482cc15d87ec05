//! Password digests, email shape checks and record id generation.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Lower-case and trim an email so lookups are case-insensitive
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Produce `sha256$<salt>$<hex>` with a fresh random salt
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}${}", SCHEME, salt, digest(&salt, password))
}

/// Check a candidate against a stored password.
/// Records without the digest prefix hold plaintext and compare exactly.
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(salt), Some(hex)) => digest(salt, candidate) == hex,
        _ => stored == candidate,
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// New record id: `prefix` followed by 8 lowercase alphanumerics,
/// regenerated until `taken` rejects it.
pub fn new_id(prefix: &str, taken: impl Fn(&str) -> bool) -> String {
    loop {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}{}", prefix, &raw[..8]);
        if !taken(&id) {
            return id;
        }
    }
}
