use serde::{Deserialize, Serialize};

use crate::utils::sort::radix_sort_u32_soa;

/// Sparse bag-of-n-grams count vector.
/// Indices are sorted ascending and unique; `dim` is the vocabulary size.
/// Created per document and owned by whoever asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureVector {
    dim: usize,
    inds: Vec<u32>,
    vals: Vec<u32>,
}

impl FeatureVector {
    /// All-zero vector of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            inds: Vec::new(),
            vals: Vec::new(),
        }
    }

    /// Build from (index, count) pairs with distinct indices.
    /// Zero counts and out-of-range indices are dropped.
    pub fn from_pairs<I>(dim: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (usize, u32)>,
    {
        let (mut inds, mut vals): (Vec<u32>, Vec<u32>) = pairs
            .into_iter()
            .filter(|&(i, c)| c > 0 && i < dim)
            .map(|(i, c)| (i as u32, c))
            .unzip();
        radix_sort_u32_soa(&mut inds, &mut vals);
        Self { dim, inds, vals }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// number of non-zero entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.inds.is_empty()
    }

    /// Count at `index`, 0 when absent.
    pub fn get(&self, index: usize) -> u32 {
        match self.inds.binary_search(&(index as u32)) {
            Ok(pos) => self.vals[pos],
            Err(_) => 0,
        }
    }

    /// Sum of counts.
    pub fn total(&self) -> u64 {
        self.vals.iter().map(|&v| v as u64).sum()
    }

    /// non-zero (index, count) pairs in ascending index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.inds.iter().zip(self.vals.iter()).map(|(&i, &v)| (i as usize, v))
    }
}
