//! Redemption codes: `XXXX-XXXX-XXXX` over a 32-symbol alphabet without the
//! look-alike characters 0, O, 1 and I.

use rand::Rng;

pub const ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Number of symbols in a code, excluding separators.
pub const CODE_LEN: usize = 12;

pub const GROUP_LEN: usize = 4;

/// Generate a fresh code from the thread-local CSPRNG.
pub fn generate() -> String {
    generate_with(&mut rand::rng())
}

pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut code = String::with_capacity(CODE_LEN + CODE_LEN / GROUP_LEN - 1);
    for i in 0..CODE_LEN {
        if i > 0 && i % GROUP_LEN == 0 {
            code.push('-');
        }
        code.push(ALPHABET[rng.random_range(0..ALPHABET.len())] as char);
    }
    code
}

/// Canonicalize user input before lookup: drop hyphens and whitespace,
/// upper-case, and regroup into hyphen-joined blocks of four.
///
/// Idempotent. Input of any length is accepted; a short or over-long code
/// simply will not match anything in the store.
pub fn normalize(input: &str) -> String {
    let symbols: Vec<char> = input
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    symbols
        .chunks(GROUP_LEN)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// True if `code` is already in canonical form and uses only the alphabet.
pub fn is_canonical(code: &str) -> bool {
    let groups: Vec<&str> = code.split('-').collect();
    groups.len() == CODE_LEN / GROUP_LEN
        && groups.iter().all(|g| {
            g.len() == GROUP_LEN && g.bytes().all(|b| ALPHABET.contains(&b))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generated_codes_are_canonical() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let code = generate_with(&mut rng);
            assert_eq!(code.len(), 14);
            assert!(is_canonical(&code), "bad code {code}");
            assert_eq!(normalize(&code), code);
        }
    }

    #[test]
    fn alphabet_excludes_ambiguous_symbols() {
        for ambiguous in [b'0', b'O', b'1', b'I'] {
            assert!(!ALPHABET.contains(&ambiguous));
        }
        let mut seen = ALPHABET.to_vec();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 32);
    }

    #[test]
    fn normalize_accepts_pasted_variants() {
        assert_eq!(normalize("ab3d-ef9h-jk2m"), "AB3D-EF9H-JK2M");
        assert_eq!(normalize(" AB3D EF9H\tJK2M "), "AB3D-EF9H-JK2M");
        assert_eq!(normalize("AB3DEF9HJK2M"), "AB3D-EF9H-JK2M");
        assert_eq!(normalize("A-B-3-D-E-F-9-H-J-K-2-M"), "AB3D-EF9H-JK2M");
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["", "-", "abc", "abcd-e", "  x y z w v  ", "ab3d-ef9h-jk2m-extra", "ßtraße"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn short_input_keeps_trailing_partial_group() {
        assert_eq!(normalize("abcdef"), "ABCD-EF");
        assert_eq!(normalize(""), "");
    }
}
