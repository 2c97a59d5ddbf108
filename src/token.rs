//! Per-request client tokens (`pi` query parameter).
//!
//! The lookup APIs expect a dotted four-octet string that changes on every
//! call. It is a churn token, not the caller's address.

use rand::Rng;

/// Source of `pi` tokens for outgoing lookups.
pub trait ClientTokenSource: Send + Sync {
    fn next_token(&self) -> String;
}

/// Fresh random `a.b.c.d` token on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomClientToken;

impl ClientTokenSource for RandomClientToken {
    fn next_token(&self) -> String {
        let mut rng = rand::rng();
        let octets: [u8; 4] = rng.random();
        format_octets(octets)
    }
}

/// Always hands out the same token. Used in tests.
#[derive(Debug, Clone)]
pub struct FixedClientToken(pub String);

impl ClientTokenSource for FixedClientToken {
    fn next_token(&self) -> String {
        self.0.clone()
    }
}

pub fn format_octets(octets: [u8; 4]) -> String {
    octets
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_shape() {
        let token = RandomClientToken.next_token();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 4);
        for part in parts {
            assert!(part.parse::<u8>().is_ok(), "octet out of range: {}", part);
        }
    }

    #[test]
    fn test_fixed_token_is_stable() {
        let source = FixedClientToken("10.0.0.1".to_string());
        assert_eq!(source.next_token(), "10.0.0.1");
        assert_eq!(source.next_token(), "10.0.0.1");
    }

    #[test]
    fn test_format_octets() {
        assert_eq!(format_octets([0, 255, 7, 42]), "0.255.7.42");
    }
}
