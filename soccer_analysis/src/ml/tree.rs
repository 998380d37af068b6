//! CART decision tree over a dense `f64` matrix (variance for regression, Gini for classes).

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::Task;

#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split (`None` = all).
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
        /// Class proportions; empty for regression.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Running sums for one side of a candidate split.
#[derive(Debug, Clone)]
struct Accumulator {
    n: f64,
    sum: f64,
    sum_sq: f64,
    counts: Vec<f64>,
}

impl Accumulator {
    fn new(n_classes: usize) -> Self {
        Self { n: 0.0, sum: 0.0, sum_sq: 0.0, counts: vec![0.0; n_classes] }
    }

    fn add(&mut self, y: f64) {
        self.n += 1.0;
        self.sum += y;
        self.sum_sq += y * y;
        if let Some(c) = self.counts.get_mut(y as usize) {
            *c += 1.0;
        }
    }

    fn remove(&mut self, y: f64) {
        self.n -= 1.0;
        self.sum -= y;
        self.sum_sq -= y * y;
        if let Some(c) = self.counts.get_mut(y as usize) {
            *c -= 1.0;
        }
    }

    fn impurity(&self, task: Task) -> f64 {
        if self.n <= 0.0 {
            return 0.0;
        }
        match task {
            Task::Regression => {
                let mean = self.sum / self.n;
                (self.sum_sq / self.n - mean * mean).max(0.0)
            }
            Task::Classification => {
                1.0 - self.counts.iter().map(|c| (c / self.n).powi(2)).sum::<f64>()
            }
        }
    }

    fn leaf(&self, task: Task) -> Node {
        match task {
            Task::Regression => Node::Leaf {
                value: if self.n > 0.0 { self.sum / self.n } else { 0.0 },
                distribution: Vec::new(),
            },
            Task::Classification => {
                let distribution: Vec<f64> = self
                    .counts
                    .iter()
                    .map(|c| if self.n > 0.0 { c / self.n } else { 0.0 })
                    .collect();
                let value = argmax(&distribution) as f64;
                Node::Leaf { value, distribution }
            }
        }
    }
}

pub(crate) fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
        .0
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    config: TreeConfig,
    task: Task,
    n_classes: usize,
    root: Option<Node>,
    /// Unnormalised weighted impurity decrease per feature.
    importances: Vec<f64>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig, task: Task, n_classes: usize) -> Self {
        Self { config, task, n_classes, root: None, importances: Vec::new() }
    }

    /// Grow the tree on the rows listed in `sample` (repeats allowed, for bootstrap samples).
    pub fn fit_sample(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        sample: &[usize],
        rng: &mut StdRng,
    ) {
        self.importances = vec![0.0; x.ncols()];
        let mut rows = sample.to_vec();
        let total = rows.len().max(1) as f64;
        self.root = Some(self.grow(x, y, &mut rows, 0, total, rng));
    }

    fn grow(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        rows: &mut [usize],
        depth: usize,
        total: f64,
        rng: &mut StdRng,
    ) -> Node {
        let mut node_stats = Accumulator::new(self.n_classes);
        for &i in rows.iter() {
            node_stats.add(y[i]);
        }
        let impurity = node_stats.impurity(self.task);

        let depth_reached = self.config.max_depth.map_or(false, |d| depth >= d);
        if depth_reached || rows.len() < self.config.min_samples_split || impurity < 1e-12 {
            return node_stats.leaf(self.task);
        }

        let best = match self.best_split(x, y, rows, &node_stats, impurity, rng) {
            Some(best) => best,
            None => return node_stats.leaf(self.task),
        };

        self.importances[best.feature] += rows.len() as f64 / total * best.gain;

        // Partition in place: rows going left first.
        let mut boundary = 0;
        for k in 0..rows.len() {
            if x[[rows[k], best.feature]] <= best.threshold {
                rows.swap(k, boundary);
                boundary += 1;
            }
        }
        let (left_rows, right_rows) = rows.split_at_mut(boundary);
        let left = self.grow(x, y, left_rows, depth + 1, total, rng);
        let right = self.grow(x, y, right_rows, depth + 1, total, rng);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn best_split(
        &self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        rows: &[usize],
        node_stats: &Accumulator,
        impurity: f64,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n = rows.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut features: Vec<usize> = (0..x.ncols()).collect();
        features.shuffle(rng);
        features.truncate(self.config.max_features.unwrap_or(x.ncols()).max(1));

        let mut best: Option<BestSplit> = None;
        let mut sorted = rows.to_vec();

        for &feature in &features {
            sorted.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left = Accumulator::new(self.n_classes);
            let mut right = node_stats.clone();

            for k in 0..n - 1 {
                let yi = y[sorted[k]];
                left.add(yi);
                right.remove(yi);

                let here = x[[sorted[k], feature]];
                let next = x[[sorted[k + 1], feature]];
                if here == next || k + 1 < min_leaf || n - (k + 1) < min_leaf {
                    continue;
                }

                let weighted = (left.n * left.impurity(self.task)
                    + right.n * right.impurity(self.task))
                    / n as f64;
                let gain = impurity - weighted;
                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(BestSplit { feature, threshold: (here + next) / 2.0, gain });
                }
            }
        }
        best
    }

    fn leaf_for(&self, row: ArrayView1<f64>) -> Option<&Node> {
        let mut node = self.root.as_ref()?;
        loop {
            match node {
                Node::Leaf { .. } => return Some(node),
                Node::Split { feature, threshold, left, right } => {
                    node = if row[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        match self.leaf_for(row) {
            Some(Node::Leaf { value, .. }) => *value,
            _ => 0.0,
        }
    }

    /// Class proportions at the leaf reached by `row`.
    pub fn predict_distribution(&self, row: ArrayView1<f64>) -> &[f64] {
        match self.leaf_for(row) {
            Some(Node::Leaf { distribution, .. }) => distribution,
            _ => &[],
        }
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        self.root.as_ref().map_or(0, depth_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::SeedableRng;

    #[test]
    fn regression_tree_fits_a_step() {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { 7.0 });
        let y = Array1::from_shape_fn(40, |i| if i < 20 { 1.0 } else { 5.0 });
        let rows: Vec<usize> = (0..40).collect();
        let mut tree = DecisionTree::new(TreeConfig::default(), Task::Regression, 0);
        tree.fit_sample(x.view(), y.view(), &rows, &mut StdRng::seed_from_u64(0));

        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.predict_row(x.row(3)), 1.0);
        assert_eq!(tree.predict_row(x.row(30)), 5.0);
        // the constant column never splits
        assert_eq!(tree.importances()[1], 0.0);
        assert!(tree.importances()[0] > 0.0);
    }

    #[test]
    fn classification_tree_separates_three_classes() {
        let x = Array2::from_shape_fn((30, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(30, |i| (i / 10) as f64);
        let rows: Vec<usize> = (0..30).collect();
        let mut tree = DecisionTree::new(TreeConfig::default(), Task::Classification, 3);
        tree.fit_sample(x.view(), y.view(), &rows, &mut StdRng::seed_from_u64(0));

        for i in 0..30 {
            assert_eq!(tree.predict_row(x.row(i)), (i / 10) as f64);
        }
        let dist = tree.predict_distribution(x.row(25));
        assert_eq!(dist, &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn max_depth_limits_growth() {
        let x = Array2::from_shape_fn((16, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(16, |i| i as f64);
        let rows: Vec<usize> = (0..16).collect();
        let config = TreeConfig { max_depth: Some(2), ..TreeConfig::default() };
        let mut tree = DecisionTree::new(config, Task::Regression, 0);
        tree.fit_sample(x.view(), y.view(), &rows, &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.depth(), 3);
    }
}
