use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of every opaque identifier (profiles, workflows, blobs).
pub const ID_LENGTH: usize = 12;

/// Generate a uniformly random identifier over `[A-Za-z0-9]`.
pub fn random_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Returns `true` if `s` matches `^[A-Za-z0-9]{12}$`.
pub fn is_valid_id(s: &str) -> bool {
    s.len() == ID_LENGTH && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
