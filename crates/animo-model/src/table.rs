//! N-dimensional integer time tables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Time bound meaning "this transition never fires".
pub const INFINITE_TIME: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("table shape {dimensions:?} holds {expected} cells, got {actual} values")]
    LengthMismatch {
        dimensions: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("index {index:?} is out of bounds for table shape {dimensions:?}")]
    OutOfBounds {
        index: Vec<usize>,
        dimensions: Vec<usize>,
    },
}

/// Row-major table of time bounds; the last dimension varies fastest.
///
/// A Mono table has one dimension (own activity level). A Bi table has two,
/// `[substrate][catalyst]`. User formula tables have one dimension per linked
/// variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    dimensions: Vec<usize>,
    values: Vec<i32>,
}

impl Table {
    /// A table of the given shape with every cell set to [`INFINITE_TIME`].
    pub fn new(dimensions: Vec<usize>) -> Self {
        let len = dimensions.iter().product();
        Self {
            dimensions,
            values: vec![INFINITE_TIME; len],
        }
    }

    pub fn from_values(dimensions: Vec<usize>, values: Vec<i32>) -> Result<Self, TableError> {
        let expected: usize = dimensions.iter().product();
        if expected != values.len() {
            return Err(TableError::LengthMismatch {
                dimensions,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self { dimensions, values })
    }

    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: &[usize]) -> Option<i32> {
        self.offset(index).map(|o| self.values[o])
    }

    pub fn set(&mut self, index: &[usize], value: i32) -> Result<(), TableError> {
        let offset = self.offset(index).ok_or_else(|| TableError::OutOfBounds {
            index: index.to_vec(),
            dimensions: self.dimensions.clone(),
        })?;
        self.values[offset] = value;
        Ok(())
    }

    /// Number of cells that are not the never-fires sentinel.
    pub fn finite_count(&self) -> usize {
        self.values.iter().filter(|&&v| v != INFINITE_TIME).count()
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dimensions.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &d) in index.iter().zip(&self.dimensions) {
            if i >= d {
                return None;
            }
            offset = offset * d + i;
        }
        Some(offset)
    }
}
