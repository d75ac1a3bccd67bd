//! Identifier generation.
//!
//! Every entity id is `{prefix}_{14 random chars}`; public short ids are
//! 8 random chars. Both draw from the 62-character alphanumeric alphabet.

use rand::Rng;

/// Length of the random part of a regular id.
pub const ID_LENGTH: usize = 14;

/// Length of a short id.
pub const SHORT_ID_LENGTH: usize = 8;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const TEMPLATE_PREFIX: &str = "temp";
pub const PROJECT_PREFIX: &str = "proj";
pub const COMPONENT_PREFIX: &str = "comp";
pub const FRAME_PREFIX: &str = "frame";
pub const PREVIEW_PREFIX: &str = "preview";
pub const IMAGE_PREFIX: &str = "img";

/// Random string of `len` characters from the id alphabet.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// New prefixed id, e.g. `temp_4fK2a9QxZ0bLmN`.
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}_{}", random_string(ID_LENGTH))
}

/// New 8-character short id.
pub fn short_id() -> String {
    random_string(SHORT_ID_LENGTH)
}

/// Whether `id` has the shape of a short id.
///
/// Regular ids are always longer than eight characters because of their
/// prefix, so length alone discriminates the two.
pub fn is_short_id(id: &str) -> bool {
    id.len() == SHORT_ID_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_has_prefix_and_length() {
        let id = unique_id(TEMPLATE_PREFIX);
        let (prefix, rest) = id.split_once('_').unwrap();
        assert_eq!(prefix, "temp");
        assert_eq!(rest.len(), ID_LENGTH);
        assert!(rest.bytes().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn short_ids_are_recognised() {
        let short = short_id();
        assert!(is_short_id(&short));
        assert!(!is_short_id(&unique_id(PROJECT_PREFIX)));
    }

    #[test]
    fn ids_do_not_repeat() {
        assert_ne!(unique_id(IMAGE_PREFIX), unique_id(IMAGE_PREFIX));
    }
}
