//! Production `Clock`/`RandomSource` implementations. Tests use
//! deterministic fakes instead (see `fs` tests) so that scenario assertions
//! don't depend on wall-clock timing or RNG draws.

use std::time::Instant;

use rand::Rng;

use crate::device::{Clock, RandomSource};

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

pub struct StdRandom {
    rng: rand::rngs::ThreadRng,
}

impl StdRandom {
    pub fn new() -> Self {
        StdRandom { rng: rand::thread_rng() }
    }
}

impl Default for StdRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for StdRandom {
    fn random(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.rng.gen_range(0..max)
    }
}
