use chrono::Utc;
use rand::{rngs::OsRng, Rng};
use sha3::{Digest, Sha3_256};
use uuid::Uuid;

pub const TICKET_NUMBER_PREFIX: &str = "TICK";
pub const TICKET_CODE_PREFIX: &str = "TCODE";

/// Width of a base36-encoded `u128` (36^25 > 2^128).
const SUFFIX_LEN: usize = 25;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub fn get_sha3_256_hash(data: &str) -> String {
    let mut hasher = Sha3_256::default();
    hasher.update(data);
    format!("{:X}", hasher.finalize())
}

/// Stored form is `<salt>$<hex digest>`.
pub fn hash_password(pwd: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = get_sha3_256_hash(&format!("{salt}{pwd}"));
    format!("{salt}${digest}")
}

pub fn verify_password(pwd: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt, digest)) => get_sha3_256_hash(&format!("{salt}{pwd}")) == digest,
        None => false,
    }
}

fn random_suffix() -> String {
    let mut value: u128 = OsRng.gen();
    let mut out = [b'0'; SUFFIX_LEN];
    for slot in out.iter_mut().rev() {
        *slot = BASE36[(value % 36) as usize];
        value /= 36;
    }
    out.iter().map(|b| *b as char).collect()
}

fn identifier(prefix: &str) -> String {
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), random_suffix())
}

/// Human-readable ticket number, `TICK-<epoch-ms>-<random>`.
pub fn new_ticket_number() -> String {
    identifier(TICKET_NUMBER_PREFIX)
}

/// Check-in code encoded in the ticket's QR image, `TCODE-<epoch-ms>-<random>`.
pub fn new_ticket_code() -> String {
    identifier(TICKET_CODE_PREFIX)
}
