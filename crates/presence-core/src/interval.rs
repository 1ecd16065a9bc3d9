//! Wait interval selection

use presence_config::DEFAULT_INTERVAL_MINUTES;
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use std::time::Duration;

/// Supplies the wait before the next prompt
pub trait IntervalSource: Send {
    fn next_interval(&mut self) -> Duration;
}

fn default_choices() -> Vec<Duration> {
    DEFAULT_INTERVAL_MINUTES
        .iter()
        .map(|m| Duration::from_secs(m * 60))
        .collect()
}

/// Uniform pick from a fixed set; every call is independent
pub struct RandomIntervals {
    choices: Vec<Duration>,
    rng: Mcg128Xsl64,
}

impl RandomIntervals {
    pub fn new(choices: Vec<Duration>) -> Self {
        Self::with_rng(choices, Mcg128Xsl64::from_entropy())
    }

    /// Reproducible sequence for a given seed
    pub fn seeded(choices: Vec<Duration>, seed: u64) -> Self {
        Self::with_rng(choices, Mcg128Xsl64::seed_from_u64(seed))
    }

    fn with_rng(choices: Vec<Duration>, rng: Mcg128Xsl64) -> Self {
        let choices = if choices.is_empty() {
            default_choices()
        } else {
            choices
        };
        Self { choices, rng }
    }

    pub fn choices(&self) -> &[Duration] {
        &self.choices
    }
}

impl Default for RandomIntervals {
    fn default() -> Self {
        Self::new(default_choices())
    }
}

impl IntervalSource for RandomIntervals {
    fn next_interval(&mut self) -> Duration {
        let index = self.rng.gen_range(0..self.choices.len());
        self.choices[index]
    }
}

/// Deterministic source that cycles through a sequence
#[derive(Debug, Clone)]
pub struct FixedIntervals {
    sequence: Vec<Duration>,
    position: usize,
}

impl FixedIntervals {
    pub fn new(sequence: Vec<Duration>) -> Self {
        let sequence = if sequence.is_empty() {
            default_choices()
        } else {
            sequence
        };
        Self {
            sequence,
            position: 0,
        }
    }

    /// Always the same wait
    pub fn constant(interval: Duration) -> Self {
        Self::new(vec![interval])
    }
}

impl IntervalSource for FixedIntervals {
    fn next_interval(&mut self) -> Duration {
        let interval = self.sequence[self.position % self.sequence.len()];
        self.position = (self.position + 1) % self.sequence.len();
        interval
    }
}
