//! Session code and client token generation.

use rand::Rng;

/// Code alphabet: uppercase alphanumerics without the visually
/// confusable I, O, 0, 1.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a random session code of the given length.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_length_and_alphabet() {
        let code = generate_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_no_confusable_characters() {
        for _ in 0..200 {
            let code = generate_code(6);
            assert!(!code.contains(['I', 'O', '0', '1']));
        }
    }

}
