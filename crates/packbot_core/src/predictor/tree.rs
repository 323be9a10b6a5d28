use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Node {
    Leaf {
        counts: Vec<usize>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// CART classifier: Gini impurity, grown until leaves are pure or no split
/// separates them. Samples with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_features: usize,
    n_classes: usize,
    root: Node,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / t;
            p * p
        })
        .sum::<f64>()
}

impl DecisionTree {
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<Self> {
        if x.is_empty() {
            bail!("cannot fit a tree on an empty dataset");
        }
        if x.len() != y.len() {
            bail!("{} rows but {} labels", x.len(), y.len());
        }
        if let Some(bad) = y.iter().find(|&&c| c >= n_classes) {
            bail!("label {bad} out of range for {n_classes} classes");
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            bail!("rows have inconsistent feature counts");
        }

        let builder = Builder { x, y, n_classes };
        let root = builder.grow((0..x.len()).collect());
        Ok(Self {
            n_features,
            n_classes,
            root,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Class distribution of the leaf `row` falls into.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut node = &self.root;
        loop {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
                Node::Leaf { counts } => {
                    let total = counts.iter().sum::<usize>().max(1) as f64;
                    return counts.iter().map(|&c| c as f64 / total).collect();
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
}

impl Builder<'_> {
    fn counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    fn grow(&self, rows: Vec<usize>) -> Node {
        let counts = self.counts(&rows);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || rows.len() < 2 {
            return Node::Leaf { counts };
        }

        let Some(split) = self.best_split(&rows) else {
            return Node::Leaf { counts };
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[r][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(left)),
            right: Box::new(self.grow(right)),
        }
    }

    /// Lowest weighted child impurity over every feature and every boundary
    /// between distinct sorted values. Earlier features and thresholds win ties.
    fn best_split(&self, rows: &[usize]) -> Option<Split> {
        let n = rows.len();
        let total = self.counts(rows);
        let mut best: Option<Split> = None;
        let mut order = rows.to_vec();

        for feature in 0..self.x[rows[0]].len() {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left = vec![0usize; self.n_classes];
            for pos in 0..n - 1 {
                left[self.y[order[pos]]] += 1;
                let here = self.x[order[pos]][feature];
                let next = self.x[order[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let nl = pos + 1;
                let nr = n - nl;
                let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let impurity = (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr)) / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}
