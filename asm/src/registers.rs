//! Register name resolution: numeric (`x5`, `f12`) and ABI mnemonic
//! (`sp`, `fa0`) forms both resolve to a plain index, since
//! `jupiter_core::isa::Operands` only ever carries indices.

/// Resolves an integer register name (`x0`..`x31` or its ABI alias) to its
/// index. Returns `None` for anything else, including float register names.
pub fn resolve_int(name: &str) -> Option<u8> {
    if let Some(digits) = name.strip_prefix('x') {
        return digits.parse::<u8>().ok().filter(|&n| n < 32);
    }
    let index = match name {
        "zero" => 0,
        "ra" => 1,
        "sp" => 2,
        "gp" => 3,
        "tp" => 4,
        "fp" => 8, // conventionally an alias for s0
        _ => {
            if let Some(digits) = name.strip_prefix('t') {
                return match digits.parse::<u8>().ok()? {
                    n @ 0..=2 => Some(5 + n),
                    n @ 3..=6 => Some(28 + (n - 3)),
                    _ => None,
                };
            }
            if let Some(digits) = name.strip_prefix('s') {
                return match digits.parse::<u8>().ok()? {
                    0 => Some(8),
                    1 => Some(9),
                    n @ 2..=11 => Some(16 + (n - 2)),
                    _ => None,
                };
            }
            if let Some(digits) = name.strip_prefix('a') {
                return digits.parse::<u8>().ok().filter(|&n| n < 8).map(|n| 10 + n);
            }
            return None;
        }
    };
    Some(index)
}

/// Resolves a float register name (`f0`..`f31` or its ABI alias) to its
/// index.
pub fn resolve_float(name: &str) -> Option<u8> {
    if let Some(digits) = name.strip_prefix('f') {
        if let Ok(n) = digits.parse::<u8>() {
            return Some(n).filter(|&n| n < 32);
        }
    }
    if let Some(digits) = name.strip_prefix("ft") {
        return match digits.parse::<u8>().ok()? {
            n @ 0..=7 => Some(n),
            n @ 8..=11 => Some(24 + (n - 8)),
            _ => None,
        };
    }
    if let Some(digits) = name.strip_prefix("fs") {
        return match digits.parse::<u8>().ok()? {
            0 => Some(8),
            1 => Some(9),
            n @ 2..=11 => Some(18 + (n - 2)),
            _ => None,
        };
    }
    if let Some(digits) = name.strip_prefix("fa") {
        return digits.parse::<u8>().ok().filter(|&n| n < 8).map(|n| 10 + n);
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolves_abi_aliases() {
        assert_eq!(resolve_int("zero"), Some(0));
        assert_eq!(resolve_int("sp"), Some(2));
        assert_eq!(resolve_int("s0"), Some(8));
        assert_eq!(resolve_int("s2"), Some(18));
        assert_eq!(resolve_int("a0"), Some(10));
        assert_eq!(resolve_int("t3"), Some(28));
        assert_eq!(resolve_int("x17"), Some(17));
    }

    #[test]
    fn resolves_float_aliases() {
        assert_eq!(resolve_float("fa0"), Some(10));
        assert_eq!(resolve_float("fs2"), Some(18));
        assert_eq!(resolve_float("ft8"), Some(24));
        assert_eq!(resolve_float("f31"), Some(31));
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(resolve_int("x32"), None);
        assert_eq!(resolve_int("nonsense"), None);
    }
}
