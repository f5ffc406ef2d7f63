//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the vector domain:
//! - `TestOceanBase`: OceanBase CE container with automatic cleanup (feature: "oceanbase")
//! - `TestDataBuilder`: Deterministic namespaces, document ids and vectors (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `oceanbase` (default): Enables OceanBase test infrastructure
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestOceanBase};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_oceanbase_test() {
//!     let ob = TestOceanBase::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let namespace = builder.namespace("main");
//!     let vector = builder.vector(3, 0);
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "oceanbase")]
mod oceanbase;

#[cfg(feature = "oceanbase")]
pub use oceanbase::TestOceanBase;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_add_document");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Namespace name unique to this test, short enough for a table name
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let ns = TestDataBuilder::new(42).namespace("main");
    /// assert_eq!(ns, "ws_42_main");
    /// ```
    pub fn namespace(&self, suffix: &str) -> String {
        format!("ws_{}_{}", self.seed % 100_000_000, suffix)
    }

    /// Deterministic document id
    pub fn doc_id(&self, index: u64) -> String {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        bytes[8..].copy_from_slice(&index.to_le_bytes());
        Uuid::from_bytes(bytes).to_string()
    }

    /// Deterministic unit-length vector of `dimension` components
    ///
    /// Different `index` values give different directions.
    pub fn vector(&self, dimension: usize, index: u64) -> Vec<f32> {
        let mut state = self
            .seed
            .wrapping_add(index.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            | 1;

        let raw: Vec<f32> = (0..dimension)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 2_000) as f32 / 1_000.0 - 1.0
            })
            .collect();

        let norm = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            let mut unit = vec![0.0; dimension];
            if let Some(first) = unit.first_mut() {
                *first = 1.0;
            }
            return unit;
        }
        raw.into_iter().map(|v| v / norm).collect()
    }

    /// Generate a unique name for testing
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that two floats are within `epsilon`
    pub fn assert_close(actual: f64, expected: f64, epsilon: f64, context: &str) {
        assert!(
            (actual - expected).abs() <= epsilon,
            "{}: expected {} (±{}), got {}",
            context,
            expected,
            epsilon,
            actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.doc_id(1), builder2.doc_id(1));
        assert_eq!(builder1.vector(8, 3), builder2.vector(8, 3));
        assert_eq!(builder1.namespace("main"), builder2.namespace("main"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.doc_id(0), builder2.doc_id(0));
    }

    #[test]
    fn test_vectors_are_unit_length_and_distinct() {
        let builder = TestDataBuilder::from_test_name("vectors");
        let a = builder.vector(16, 0);
        let b = builder.vector(16, 1);

        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assertions::assert_close(norm as f64, 1.0, 1e-5, "unit norm");
        assert_ne!(a, b);
    }

    #[test]
    fn test_namespace_fits_table_name() {
        let builder = TestDataBuilder::new(u64::MAX);
        assert!(builder.namespace("main").len() < 60);
    }
}
