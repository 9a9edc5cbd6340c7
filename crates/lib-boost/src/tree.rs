//! Regression trees grown on binned features.
//!
//! # Split Finding
//!
//! Each feature is quantised into at most `max_bins` bins. A node builds
//! per-bin gradient/hessian histograms and scans them for the split with
//! the best regularised gain:
//!
//! ```text
//! score(G, H) = T_α(G)² / (H + λ)
//! gain        = ½ [score(G_L, H_L) + score(G_R, H_R) − score(G, H)]
//! leaf        = −T_α(G) / (H + λ)
//! ```
//!
//! where `T_α` soft-thresholds the gradient sum by the L1 penalty.

use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantile bin edges for one feature.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBins {
    /// Ascending cut points; bin `b` holds values in `(cuts[b-1], cuts[b]]`.
    pub cuts: Vec<f64>,
}

impl FeatureBins {
    /// Build cut points from a feature column.
    pub fn from_column(column: ArrayView1<'_, f64>, max_bins: usize) -> Self {
        let mut unique: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
        unique.sort_by(|a, b| a.total_cmp(b));
        unique.dedup();

        if unique.len() < 2 {
            return Self { cuts: Vec::new() };
        }

        let mut cuts: Vec<f64> = if unique.len() <= max_bins {
            unique.windows(2).map(|w| midpoint(w[0], w[1])).collect()
        } else {
            (1..max_bins)
                .map(|k| {
                    let idx = k * unique.len() / max_bins;
                    midpoint(unique[idx - 1], unique[idx])
                })
                .collect()
        };
        cuts.dedup();
        Self { cuts }
    }

    pub fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    /// Bin index of a value. NaN falls in bin 0.
    #[inline]
    pub fn bin(&self, value: f64) -> u8 {
        self.cuts.partition_point(|&c| c < value) as u8
    }
}

#[inline]
fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}

/// Features quantised once for the whole fit.
#[derive(Clone, Debug)]
pub struct BinnedMatrix {
    pub bins: Vec<FeatureBins>,
    /// Column-major bin indices: `codes[feature][row]`.
    pub codes: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    pub fn new(x: ArrayView2<'_, f64>, max_bins: usize) -> Self {
        let (bins, codes): (Vec<_>, Vec<_>) = (0..x.ncols())
            .into_par_iter()
            .map(|f| {
                let column = x.column(f);
                let bins = FeatureBins::from_column(column, max_bins);
                let codes: Vec<u8> = column.iter().map(|&v| bins.bin(v)).collect();
                (bins, codes)
            })
            .unzip();
        Self { bins, codes }
    }

    pub fn n_features(&self) -> usize {
        self.bins.len()
    }
}

/// Tree-growing limits and penalties.
#[derive(Clone, Copy, Debug)]
pub struct TreeParams {
    pub max_depth: usize,
    pub lambda: f64,
    pub alpha: f64,
    pub min_child_weight: f64,
    /// Multiplier applied to every leaf value.
    pub shrinkage: f64,
}

/// A node of a fitted tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        /// Values `<=` threshold (and NaN) go left.
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted regression tree; node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    feature: usize,
    bin: u8,
    gain: f64,
}

#[inline]
fn soft_threshold(g: f64, alpha: f64) -> f64 {
    g.signum() * (g.abs() - alpha).max(0.0)
}

#[inline]
fn score(g: f64, h: f64, p: &TreeParams) -> f64 {
    let t = soft_threshold(g, p.alpha);
    t * t / (h + p.lambda)
}

#[inline]
fn leaf_weight(g: f64, h: f64, p: &TreeParams) -> f64 {
    -soft_threshold(g, p.alpha) / (h + p.lambda)
}

impl RegressionTree {
    /// Grow a tree on `rows` using only `features`.
    pub fn grow(
        data: &BinnedMatrix,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        features: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(data, grad, hess, rows, features, params, 0);
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn grow_node(
        &mut self,
        data: &BinnedMatrix,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        features: &[usize],
        params: &TreeParams,
        depth: usize,
    ) -> usize {
        let g: f64 = rows.iter().map(|&r| grad[r]).sum();
        let h: f64 = rows.iter().map(|&r| hess[r]).sum();
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: leaf_weight(g, h, params) * params.shrinkage,
        });

        if depth >= params.max_depth || rows.len() < 2 {
            return id;
        }

        let best = features
            .par_iter()
            .filter_map(|&f| best_split(data, grad, hess, &rows, f, g, h, params))
            .reduce_with(|a, b| if b.gain > a.gain { b } else { a });

        let Some(split) = best else {
            return id;
        };

        let codes = &data.codes[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| codes[r] <= split.bin);

        let left = self.grow_node(data, grad, hess, left_rows, features, params, depth + 1);
        let right = self.grow_node(data, grad, hess, right_rows, features, params, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: data.bins[split.feature].cuts[split.bin as usize],
            left,
            right,
        };
        id
    }

    /// Predict one row of raw feature values.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] > *threshold { *right } else { *left };
                }
            }
        }
    }

    /// Largest feature index referenced by a split, if any.
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn best_split(
    data: &BinnedMatrix,
    grad: &[f64],
    hess: &[f64],
    rows: &[usize],
    feature: usize,
    g_total: f64,
    h_total: f64,
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let n_bins = data.bins[feature].n_bins();
    if n_bins < 2 {
        return None;
    }

    let codes = &data.codes[feature];
    let mut hist_g = vec![0.0; n_bins];
    let mut hist_h = vec![0.0; n_bins];
    for &r in rows {
        let b = codes[r] as usize;
        hist_g[b] += grad[r];
        hist_h[b] += hess[r];
    }

    let parent = score(g_total, h_total, params);
    let mut best: Option<SplitCandidate> = None;
    let (mut gl, mut hl) = (0.0, 0.0);

    // Splitting after the last bin leaves the right side empty.
    for b in 0..n_bins - 1 {
        gl += hist_g[b];
        hl += hist_h[b];
        let (gr, hr) = (g_total - gl, h_total - hl);
        if hl < params.min_child_weight || hr < params.min_child_weight {
            continue;
        }

        let gain = 0.5 * (score(gl, hl, params) + score(gr, hr, params) - parent);
        if gain > 1e-12 && best.map_or(true, |s| gain > s.gain) {
            best = Some(SplitCandidate {
                feature,
                bin: b as u8,
                gain,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn params() -> TreeParams {
        TreeParams {
            max_depth: 3,
            lambda: 0.0,
            alpha: 0.0,
            min_child_weight: 1.0,
            shrinkage: 1.0,
        }
    }

    #[test]
    fn test_bins_are_monotone() {
        let col = array![5.0, 1.0, 3.0, 3.0, 9.0];
        let bins = FeatureBins::from_column(col.view(), 64);
        assert_eq!(bins.cuts, vec![2.0, 4.0, 7.0]);
        assert_eq!(bins.bin(1.0), 0);
        assert_eq!(bins.bin(2.0), 0);
        assert_eq!(bins.bin(3.0), 1);
        assert_eq!(bins.bin(100.0), 3);
        assert_eq!(bins.bin(f64::NAN), 0);
    }

    #[test]
    fn test_bins_capped() {
        let col = ndarray::Array1::from_iter((0..1000).map(|i| i as f64));
        let bins = FeatureBins::from_column(col.view(), 16);
        assert_eq!(bins.n_bins(), 16);
        assert!(bins.cuts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_constant_feature_has_no_split() {
        let col = array![2.0, 2.0, 2.0];
        assert_eq!(FeatureBins::from_column(col.view(), 64).n_bins(), 1);
    }

    #[test]
    fn test_tree_recovers_step() {
        // y = 0 for x <= 5, y = 10 above; gradients at prediction 0 are -y.
        let x = Array2::from_shape_fn((10, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..10).map(|i| if i <= 5 { 0.0 } else { 10.0 }).collect();
        let grad: Vec<f64> = y.iter().map(|v| -v).collect();
        let hess = vec![1.0; 10];

        let data = BinnedMatrix::new(x.view(), 64);
        let tree = RegressionTree::grow(&data, &grad, &hess, (0..10).collect(), &[0], &params());

        match &tree.nodes[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 5.5);
            }
            Node::Leaf { .. } => panic!("expected a split at the root"),
        }
        for i in 0..10 {
            let pred = tree.predict_row(x.row(i));
            assert!((pred - y[i]).abs() < 1e-9, "row {}: {}", i, pred);
        }
    }

    #[test]
    fn test_depth_limit() {
        let x = Array2::from_shape_fn((64, 1), |(i, _)| i as f64);
        let grad: Vec<f64> = (0..64).map(|i| ((i * 7) % 13) as f64).collect();
        let hess = vec![1.0; 64];
        let data = BinnedMatrix::new(x.view(), 64);
        let tree = RegressionTree::grow(&data, &grad, &hess, (0..64).collect(), &[0], &params());
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_l1_penalty_shrinks_leaf() {
        let p = TreeParams { alpha: 1.0, lambda: 1.0, ..params() };
        assert_eq!(leaf_weight(0.5, 3.0, &p), 0.0);
        assert_eq!(leaf_weight(-5.0, 3.0, &p), 1.0);
    }
}
