use sha2::{Digest, Sha256};

/// Stable pseudo-random values keyed by their inputs.
///
/// The same seed and key always produce the same value, on every platform
/// and across releases, so synthetic sources answer identically for
/// identical questions.
#[derive(Debug, Clone)]
pub struct Sampler {
    seed: String,
}

impl Sampler {
    pub fn new(seed: impl Into<String>) -> Self {
        Self { seed: seed.into() }
    }

    /// A value in `[0, 1)`
    pub fn unit(&self, key: &[&str]) -> f64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.as_bytes());
        for part in key {
            hasher.update([0x1fu8]);
            hasher.update(part.to_lowercase().as_bytes());
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        // 53 bits fill an f64 mantissa exactly
        (u64::from_be_bytes(bytes) >> 11) as f64 / (1u64 << 53) as f64
    }

    /// A value in `[low, high)`
    pub fn range(&self, key: &[&str], low: f64, high: f64) -> f64 {
        low + self.unit(key) * (high - low)
    }

    /// An integer in `[low, high]`
    pub fn int(&self, key: &[&str], low: i64, high: i64) -> i64 {
        let span = (high - low + 1) as f64;
        low + ((self.unit(key) * span) as i64).min(high - low)
    }

    /// One element of a non-empty slice
    pub fn pick<'a, T>(&self, key: &[&str], items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.int(key, 0, items.len() as i64 - 1) as usize;
        items.get(index)
    }
}

/// Round to `places` decimal places for presentation
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
