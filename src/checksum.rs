//! Password hashing and the login checksum
//!
//! Both are keyed by the challenge token, binding a request to one token
//! issuance. The server recomputes the checksum byte-for-byte and rejects
//! any deviation silently, so the field order and the literal `"200"` and
//! `"1"` constants below are protocol-mandated.

use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::{Digest, Sha1};

/// Hex HMAC-MD5 of the password keyed by the challenge token. The login
/// request carries this with a `{MD5}` tag prepended.
pub fn hashed_password(password: &str, token: &str) -> String {
    let mut mac =
        Hmac::<Md5>::new_from_slice(token.as_bytes()).expect("hmac accepts any key length");
    mac.update(password.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// SHA1 hex over the fixed field sequence, the token repeated before
/// every field:
/// `tok+user tok+hashed_pw tok+ac_id tok+ip tok+"200" tok+"1" tok+payload`.
pub fn build(
    token: &str,
    username: &str,
    hashed_password: &str,
    ac_id: &str,
    ip: &str,
    payload: &str,
) -> String {
    let mut data = String::new();
    for field in [username, hashed_password, ac_id, ip, "200", "1", payload] {
        data.push_str(token);
        data.push_str(field);
    }
    hex::encode(Sha1::digest(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_checksum() {
        assert_eq!(
            build("tok", "u1", "hp", "76", "10.0.0.1", "{SRBX1}abc"),
            "a662167fde5ce16bd672ce53e41b95d6013f30f1"
        );
    }

    #[test]
    fn pinned_hashed_password() {
        assert_eq!(
            hashed_password("hunter2", "tok"),
            "151c2047f710b957d9644863befb03cc"
        );
        assert_eq!(
            hashed_password("password", "1234567890"),
            "da76ab13f7d6d481ef3abc99e5d0f6c5"
        );
    }

    #[test]
    fn token_position_matters() {
        // Swapping any two fields must change the digest; the server gives
        // no diagnostic when it does not match.
        let a = build("t", "user", "hp", "76", "1.2.3.4", "{SRBX1}x");
        let b = build("t", "hp", "user", "76", "1.2.3.4", "{SRBX1}x");
        assert_ne!(a, b);
    }
}
