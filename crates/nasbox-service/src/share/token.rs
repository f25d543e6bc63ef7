//! Share token generation.

/// Generate a hex token carrying `bytes` bytes of randomness.
pub fn generate(bytes: usize) -> String {
    let raw: Vec<u8> = (0..bytes).map(|_| rand::random::<u8>()).collect();
    hex::encode(raw)
}
