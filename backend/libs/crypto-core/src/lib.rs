//! Token signing and digest helpers shared by VOXILABS services.

pub mod hash;
pub mod jwt;

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// Generate a random alphanumeric string from the OS RNG.
pub fn random_alphanumeric(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a string of `len` random decimal digits, leading zeros allowed.
pub fn random_digits(len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
