//! HyperLogLog cardinality estimator
//!
//! Implementation of the HyperLogLog algorithm with a sparse mode for small
//! cardinalities and linear counting for small dense ones.

use crate::error::MergeError;
use crate::traits::{CardinalitySketch, Sketch};
use std::collections::HashSet;
use xxhash_rust::xxh3::xxh3_64;

/// Register storage
#[derive(Clone, Debug)]
enum Registers {
    /// Exact set of hashes, kept while it is smaller than the dense array
    Sparse(HashSet<u64>),
    /// One byte per register
    Dense(Vec<u8>),
}

/// HyperLogLog cardinality estimator
///
/// Estimates the number of distinct elements with configurable precision.
/// Dense memory usage is 2^precision bytes; until a sketch has seen
/// `2^precision / 16` distinct hashes it keeps them exactly instead, so
/// small columns report exact distinct counts.
///
/// # Error Rate
///
/// The relative standard error is approximately 1.04 / sqrt(m) where m = 2^precision.
///
/// | Precision | Memory | Error |
/// |-----------|--------|-------|
/// | 10 | 1 KB | ~3.25% |
/// | 12 | 4 KB | ~1.63% |
/// | 14 | 16 KB | ~0.81% |
/// | 16 | 64 KB | ~0.41% |
/// | 17 | 128 KB | ~0.29% |
/// | 18 | 256 KB | ~0.20% |
///
/// # Example
///
/// ```
/// use flowprint::cardinality::HyperLogLog;
/// use flowprint::traits::CardinalitySketch;
///
/// let mut hll = HyperLogLog::new(12);
///
/// for i in 0..10000 {
///     hll.insert(&format!("user_{}", i));
/// }
///
/// let count = hll.estimate();
/// assert!(count > 9_000.0 && count < 11_000.0);
/// ```
#[derive(Clone, Debug)]
pub struct HyperLogLog {
    /// Precision parameter (4-18)
    precision: u8,
    registers: Registers,
    /// Number of items inserted
    count: u64,
}

impl HyperLogLog {
    /// Create a new HyperLogLog with the given precision
    ///
    /// Precision must be between 4 and 18 inclusive.
    /// Higher precision gives better accuracy but uses more memory.
    ///
    /// # Panics
    ///
    /// Panics if precision is not in range [4, 18]
    pub fn new(precision: u8) -> Self {
        assert!(
            (4..=18).contains(&precision),
            "precision must be between 4 and 18"
        );

        Self {
            precision,
            registers: Registers::Sparse(HashSet::new()),
            count: 0,
        }
    }

    /// Create a HyperLogLog whose estimates stay within `target_error`
    /// with high probability (three standard errors)
    pub fn with_error_bound(target_error: f64) -> Self {
        Self::new(super::precision_for_bound(target_error, 3.0))
    }

    /// Get the precision parameter
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Get the number of registers (m = 2^precision)
    pub fn num_registers(&self) -> usize {
        1usize << self.precision
    }

    /// Whether the sketch still counts exactly
    pub fn is_sparse(&self) -> bool {
        matches!(self.registers, Registers::Sparse(_))
    }

    fn sparse_limit(&self) -> usize {
        self.num_registers() / 16
    }

    /// Insert an item by its bytes
    pub fn insert(&mut self, item: &str) {
        self.insert_bytes(item.as_bytes());
    }

    /// Insert raw bytes
    pub fn insert_bytes(&mut self, bytes: &[u8]) {
        let hash = xxh3_64(bytes);
        self.insert_hash(hash);
    }

    /// Insert a pre-computed hash value
    pub fn insert_hash(&mut self, hash: u64) {
        self.count += 1;

        let limit = self.sparse_limit();
        match &mut self.registers {
            Registers::Sparse(set) => {
                set.insert(hash);
                if set.len() > limit {
                    self.densify();
                }
            }
            Registers::Dense(registers) => Self::set_register(registers, self.precision, hash),
        }
    }

    fn set_register(registers: &mut [u8], precision: u8, hash: u64) {
        // Use first p bits for register index
        let idx = (hash >> (64 - precision)) as usize;

        // Count leading zeros in remaining bits + 1
        let w = hash << precision | (1u64 << (precision - 1));
        let rho = w.leading_zeros() as u8 + 1;

        if rho > registers[idx] {
            registers[idx] = rho;
        }
    }

    /// Switch from the exact hash set to registers
    fn densify(&mut self) {
        if let Registers::Sparse(set) = &self.registers {
            let mut registers = vec![0u8; self.num_registers()];
            for &hash in set {
                Self::set_register(&mut registers, self.precision, hash);
            }
            self.registers = Registers::Dense(registers);
        }
    }

    /// Raw estimate using harmonic mean
    fn raw_estimate(registers: &[u8]) -> f64 {
        let m = registers.len() as f64;

        // Compute harmonic mean of 2^(-register[i])
        let sum: f64 = registers.iter().map(|&r| 2f64.powi(-(r as i32))).sum();

        Self::alpha_m(registers.len()) * m * m / sum
    }

    /// Alpha constant for given m
    fn alpha_m(m: usize) -> f64 {
        match m {
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / m as f64),
        }
    }

    /// Linear counting estimate for small cardinalities
    fn linear_counting(m: usize, zeros: usize) -> f64 {
        let m = m as f64;
        m * (m / zeros as f64).ln()
    }

    fn dense_estimate(registers: &[u8]) -> f64 {
        let raw = Self::raw_estimate(registers);
        let threshold = 2.5 * registers.len() as f64;

        if raw <= threshold {
            let zeros = registers.iter().filter(|&&r| r == 0).count();
            if zeros > 0 {
                let lc = Self::linear_counting(registers.len(), zeros);
                if lc <= threshold {
                    return lc;
                }
            }
        }

        raw
    }
}

impl Sketch for HyperLogLog {
    /// Items are inserted by hash
    type Item = u64;

    fn update(&mut self, hash: &u64) {
        self.insert_hash(*hash);
    }

    fn merge(&mut self, other: &Self) -> Result<(), MergeError> {
        if self.precision != other.precision {
            return Err(MergeError::IncompatibleConfig {
                expected: format!("precision={}", self.precision),
                found: format!("precision={}", other.precision),
            });
        }

        match &other.registers {
            Registers::Sparse(theirs) => {
                let count = self.count;
                for &hash in theirs {
                    self.insert_hash(hash);
                }
                self.count = count;
            }
            Registers::Dense(theirs) => {
                self.densify();
                if let Registers::Dense(ours) = &mut self.registers {
                    // Take element-wise max
                    for (a, &b) in ours.iter_mut().zip(theirs.iter()) {
                        *a = (*a).max(b);
                    }
                }
            }
        }

        self.count += other.count;
        Ok(())
    }

    fn clear(&mut self) {
        self.registers = Registers::Sparse(HashSet::new());
        self.count = 0;
    }

    fn size_bytes(&self) -> usize {
        let payload = match &self.registers {
            Registers::Sparse(set) => set.capacity() * core::mem::size_of::<u64>(),
            Registers::Dense(registers) => registers.len(),
        };
        payload + core::mem::size_of::<Self>()
    }

    fn count(&self) -> u64 {
        self.count
    }
}

impl CardinalitySketch for HyperLogLog {
    fn estimate(&self) -> f64 {
        match &self.registers {
            Registers::Sparse(set) => set.len() as f64,
            Registers::Dense(registers) => Self::dense_estimate(registers),
        }
    }
}
