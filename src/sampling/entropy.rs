use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of per-request RNG seeds.
pub trait EntropySource: Send + Sync {
    fn seed(&self) -> u64;
}

/// Seeds from the high-resolution clock, the process id and a call sequence.
///
/// Worker processes started at the same instant differ by pid; two calls in
/// the same clock tick differ by sequence.
#[derive(Debug, Default)]
pub struct ClockEntropy {
    sequence: AtomicU64,
}

impl ClockEntropy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntropySource for ClockEntropy {
    fn seed(&self) -> u64 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        nanos
            ^ (u64::from(process::id()) << 32)
            ^ sequence.wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

/// Always returns the same seed. Reproducible draws for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(pub u64);

impl EntropySource for FixedEntropy {
    fn seed(&self) -> u64 {
        self.0
    }
}
