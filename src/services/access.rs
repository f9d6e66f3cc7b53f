//! Gallery access control: secret verification and secret/slug generation.
//!
//! Verification is an exact string comparison against the stored secret.
//! There is deliberately no hashing, rate limiting, or lockout here; the
//! gallery secret is a convenience gate shared with the client, not an
//! account credential.

use chrono::Utc;
use rand::Rng;

use crate::models::gallery::Gallery;

/// Characters a generated secret draws from. Visually ambiguous characters
/// (l, I, O, 0, 1) are excluded.
pub const SECRET_ALPHABET: &[u8] = b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Default length for generated gallery secrets.
pub const DEFAULT_SECRET_LENGTH: usize = 12;

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// True iff `supplied` equals the gallery's stored secret, byte for byte.
pub fn verify_secret(gallery: &Gallery, supplied: &str) -> bool {
    gallery.secret == supplied
}

/// Generate a random secret of `length` characters from [`SECRET_ALPHABET`].
pub fn generate_secret(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| SECRET_ALPHABET[rng.random_range(0..SECRET_ALPHABET.len())] as char)
        .collect()
}

/// Derive a URL-safe slug from a display name.
///
/// The name is lowercased, runs of non-alphanumeric characters collapse to a
/// single hyphen, and a uniqueness token is appended: the base-36 creation
/// timestamp plus two random base-36 characters, so two galleries created
/// with the same name in the same millisecond still get distinct slugs.
/// Slugs are immutable after creation.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len() + 12);
    let mut last_hyphen = false;
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_hyphen = false;
        } else if !last_hyphen && !slug.is_empty() {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.push('-');
    slug.push_str(&slug_token());
    slug
}

fn slug_token() -> String {
    let mut token = to_base36(Utc::now().timestamp_millis().max(0) as u64);
    let mut rng = rand::rng();
    for _ in 0..2 {
        token.push(BASE36_ALPHABET[rng.random_range(0..BASE36_ALPHABET.len())] as char);
    }
    token
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::gallery::SessionType;
    use uuid::Uuid;

    fn gallery_with_secret(secret: &str) -> Gallery {
        Gallery {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            slug: "test-abc".to_string(),
            secret: secret.to_string(),
            client_email: None,
            session_type: SessionType::Wedding,
            date_label: "June 2025".to_string(),
            cover_photo: None,
            photo_count: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn verify_requires_exact_match() {
        let gallery = gallery_with_secret("Abc23456wxyz");
        assert!(verify_secret(&gallery, "Abc23456wxyz"));
        assert!(!verify_secret(&gallery, "abc23456wxyz"));
        assert!(!verify_secret(&gallery, "Abc23456wxy"));
        assert!(!verify_secret(&gallery, ""));
    }

    #[test]
    fn generated_secret_uses_alphabet_and_length() {
        let secret = generate_secret(DEFAULT_SECRET_LENGTH);
        assert_eq!(secret.len(), 12);
        assert!(secret.bytes().all(|b| SECRET_ALPHABET.contains(&b)));

        let long = generate_secret(32);
        assert_eq!(long.len(), 32);
    }

    #[test]
    fn slug_normalizes_name_and_appends_token() {
        let slug = generate_slug("Kathy & Scotty");
        assert!(slug.starts_with("kathy-scotty-"));
        let token = &slug["kathy-scotty-".len()..];
        assert!(!token.is_empty());
        assert!(token.bytes().all(|b| BASE36_ALPHABET.contains(&b)));
    }

    #[test]
    fn slug_collapses_runs_and_trims_edges() {
        let slug = generate_slug("  --Smith // Family!!  ");
        assert!(slug.starts_with("smith-family-"));
        assert!(!slug.contains("--"));
    }

    #[test]
    fn slugs_differ_for_identical_names() {
        let a = generate_slug("Same Name");
        let b = generate_slug("Same Name");
        assert_ne!(a, b);
    }

    #[test]
    fn base36_round_trips_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }
}
