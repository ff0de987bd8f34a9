//! Access code generation.

use uuid::Uuid;

/// Length of generated access codes
pub const CODE_LEN: usize = 8;

const ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a random 8-character uppercase base-36 code from a v4 UUID.
pub fn generate_access_code() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut code = String::with_capacity(CODE_LEN);
    for _ in 0..CODE_LEN {
        code.push(ALPHABET[(bits % 36) as usize] as char);
        bits /= 36;
    }
    code
}

/// Resolve the code for a new share: a non-blank custom code is used
/// verbatim, anything else gets a generated code.
pub fn resolve_access_code(custom: Option<&str>) -> String {
    match custom {
        Some(code) if !code.trim().is_empty() => code.to_string(),
        _ => generate_access_code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_code_shape() {
        for _ in 0..200 {
            let code = generate_access_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn generated_codes_vary() {
        let codes: HashSet<String> = (0..100).map(|_| generate_access_code()).collect();
        assert!(codes.len() > 95);
    }

    #[test]
    fn custom_code_kept_verbatim() {
        assert_eq!(resolve_access_code(Some("my code")), "my code");
        assert_eq!(resolve_access_code(Some("lower")), "lower");
    }

    #[test]
    fn blank_custom_code_is_generated() {
        assert_eq!(resolve_access_code(Some("   ")).len(), CODE_LEN);
        assert_eq!(resolve_access_code(None).len(), CODE_LEN);
    }
}
