//! Block configuration shared by every buffer of a patch.

#![forbid(unsafe_code)]

use std::fmt;

/// Numeric element type of every signal buffer.
pub type Sample = f32;

/// Default number of samples per block.
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Execution parameters fixed before any buffer is allocated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockConfig {
    block_size: usize,
    sample_rate: f32,
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Block size must hold at least one sample.
    ZeroBlockSize,
    /// Sample rate must be finite and positive.
    InvalidSampleRate(f32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroBlockSize => write!(f, "block size must be greater than zero"),
            ConfigError::InvalidSampleRate(sr) => write!(f, "invalid sample rate {}", sr),
        }
    }
}

impl std::error::Error for ConfigError {}

impl BlockConfig {
    /// Build a validated configuration.
    pub fn new(block_size: usize, sample_rate: f32) -> Result<Self, ConfigError> {
        if block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            block_size,
            sample_rate,
        })
    }

    /// Samples per block; the length of every signal buffer.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// A zeroed buffer of exactly one block.
    pub(crate) fn alloc_buffer(&self) -> Box<[Sample]> {
        vec![0.0; self.block_size].into_boxed_slice()
    }
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}
