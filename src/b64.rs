//! Base64 with the portal's private alphabet
//!
//! Standard 3-bytes-to-4-symbols grouping and `=` padding, but every
//! 6-bit index goes through a shuffled 64-character alphabet instead of
//! the RFC one. The encrypted info blob is carried in this encoding.

use base64::alphabet::Alphabet;
use base64::engine::general_purpose::PAD;
use base64::engine::{Engine, GeneralPurpose};

/// The portal's shuffled alphabet, verbatim from its login page script.
pub const PORTAL_ALPHABET: &str =
    "LVoJPiCN2R8G90yg+hmFHuacZ1OWMnrsSTXkYpUq/3dlbfKwv6xztjI7DeBE45QA";

const ALPHABET: Alphabet = match Alphabet::new(PORTAL_ALPHABET) {
    Ok(alphabet) => alphabet,
    Err(_) => panic!("portal alphabet is not a valid base64 alphabet"),
};

const ENGINE: GeneralPurpose = GeneralPurpose::new(&ALPHABET, PAD);

/// Encode bytes with the portal alphabet. Empty input yields an empty
/// string.
pub fn encode(data: &[u8]) -> String {
    ENGINE.encode(data)
}
