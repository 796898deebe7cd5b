//! Categorical split storage for tree nodes.
//!
//! A categorical split stores the set of category ids that go RIGHT as a
//! packed `u32` bitset. Categories not in the set go left; a missing value
//! follows the node's default direction.

use super::NodeId;

/// Packed bitsets for all categorical nodes of one tree.
///
/// - `bitsets`: flat array of words, 32 categories per word
/// - `segments`: per-node `(start, size)` into `bitsets`; `(0, 0)` for nodes
///   without a categorical split
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoriesStorage {
    bitsets: Box<[u32]>,
    segments: Box<[(u32, u32)]>,
}

impl CategoriesStorage {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create storage from raw words and per-node segments.
    pub fn new(bitsets: Vec<u32>, segments: Vec<(u32, u32)>) -> Self {
        Self {
            bitsets: bitsets.into_boxed_slice(),
            segments: segments.into_boxed_slice(),
        }
    }

    /// Build storage for a tree of `n_nodes` nodes from `(node, right_set)` pairs.
    pub fn from_node_sets<'a, I>(n_nodes: usize, sets: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, &'a [u32])>,
    {
        let mut bitsets = Vec::new();
        let mut segments = vec![(0u32, 0u32); n_nodes];
        let mut any = false;

        for (node, categories) in sets {
            any = true;
            let words = categories_to_bitset(categories);
            if let Some(segment) = segments.get_mut(node as usize) {
                *segment = (bitsets.len() as u32, words.len() as u32);
                bitsets.extend_from_slice(&words);
            }
        }

        if !any {
            return Self::empty();
        }
        Self::new(bitsets, segments)
    }

    /// Whether `category` is in the right-going set of `node`.
    #[inline]
    pub fn category_goes_right(&self, node: NodeId, category: u32) -> bool {
        let Some(&(start, size)) = self.segments.get(node as usize) else {
            return false;
        };

        // word = category / 32, bit = category % 32
        let word_idx = category >> 5;
        let bit_idx = category & 31;
        if word_idx >= size {
            return false;
        }

        let word = self.bitsets[(start + word_idx) as usize];
        (word >> bit_idx) & 1 != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitsets.is_empty()
    }

    #[inline]
    pub fn segments(&self) -> &[(u32, u32)] {
        &self.segments
    }

    #[inline]
    pub fn bitsets(&self) -> &[u32] {
        &self.bitsets
    }

    /// Decode the right-going category ids of `node`, ascending.
    pub fn category_set(&self, node: NodeId) -> Vec<u32> {
        let Some(&(start, size)) = self.segments.get(node as usize) else {
            return Vec::new();
        };
        let words = &self.bitsets[start as usize..(start + size) as usize];

        let mut out = Vec::new();
        for (w, &word) in words.iter().enumerate() {
            for bit in 0..32u32 {
                if (word >> bit) & 1 != 0 {
                    out.push(w as u32 * 32 + bit);
                }
            }
        }
        out
    }
}

/// Convert an encoded feature value to a category id.
///
/// The encoder only ever produces non-negative whole numbers (or NaN, which is
/// routed before this is called).
#[inline]
pub fn float_to_category(value: f32) -> u32 {
    debug_assert!(!value.is_nan(), "NaN must be handled as missing first");
    debug_assert!(value >= 0.0 && value == value.trunc(), "bad category {value}");
    value as u32
}

/// Pack category ids into `u32` words, bit `c` set for each id `c`.
pub fn categories_to_bitset(categories: &[u32]) -> Vec<u32> {
    let Some(&max_cat) = categories.iter().max() else {
        return Vec::new();
    };

    let mut bitset = vec![0u32; ((max_cat >> 5) + 1) as usize];
    for &cat in categories {
        bitset[(cat >> 5) as usize] |= 1 << (cat & 31);
    }
    bitset
}
