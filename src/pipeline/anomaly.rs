//! Statistical outlier detection.
//!
//! A seeded isolation forest fit and scored on the same batch in one pass:
//! random axis-parallel splits isolate outlying points in fewer steps, so a
//! short average path length means a high outlier score. The model is not
//! persisted or reused; every run fits fresh on its own dataset.
//!
//! The binding contract is a stable, seeded selection of the top
//! `round(contamination * n)` outliers over the fixed feature vector
//! [amount, line count, entry hour, manual indicator], with missing values
//! imputed to zero before fitting.

use crate::config::DetectorSettings;
use crate::core::FeatureRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const FEATURE_COUNT: usize = 4;

/// Euler-Mascheroni constant, for the average-path-length baseline.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Flag the most outlying records. Returns one 0/1 flag per input record,
/// in input order; exactly `round(contamination * n)` rows are flagged,
/// ties broken by row order.
pub fn detect_outliers(settings: &DetectorSettings, records: &[FeatureRecord]) -> Vec<u8> {
    if records.is_empty() {
        return Vec::new();
    }

    let data: Vec<[f64; FEATURE_COUNT]> = records.iter().map(feature_vector).collect();
    let forest = IsolationForest::fit(settings, &data);
    let scores: Vec<f64> = data.iter().map(|row| forest.score(row)).collect();

    flag_top_fraction(&scores, settings.contamination)
}

/// Numeric feature vector with missing values imputed to zero.
fn feature_vector(record: &FeatureRecord) -> [f64; FEATURE_COUNT] {
    [
        record.transaction.amount.filter(|a| a.is_finite()).unwrap_or(0.0),
        record.line_count as f64,
        record.entry_hour.map(f64::from).unwrap_or(0.0),
        record.is_manual as f64,
    ]
}

/// Flag the `round(fraction * n)` highest scores, earliest rows first on
/// ties, so the selection is stable for a fixed seed and input order.
fn flag_top_fraction(scores: &[f64], fraction: f64) -> Vec<u8> {
    let n = scores.len();
    let target = (fraction * n as f64).round() as usize;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut flags = vec![0u8; n];
    for &index in order.iter().take(target) {
        flags[index] = 1;
    }
    flags
}

struct IsolationForest {
    trees: Vec<Tree>,
    /// Expected path length for the per-tree sample size, used to
    /// normalize scores into (0, 1).
    baseline: f64,
}

enum Tree {
    Split {
        feature: usize,
        value: f64,
        left: Box<Tree>,
        right: Box<Tree>,
    },
    Leaf {
        size: usize,
    },
}

impl IsolationForest {
    fn fit(settings: &DetectorSettings, data: &[[f64; FEATURE_COUNT]]) -> Self {
        let mut rng = StdRng::seed_from_u64(settings.seed);
        let sample_size = settings.sample_size.min(data.len()).max(2);
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..settings.trees)
            .map(|_| {
                let sample = subsample(&mut rng, data.len(), sample_size);
                build_tree(&mut rng, data, &sample, 0, height_limit)
            })
            .collect();

        Self {
            trees,
            baseline: average_path_length(sample_size),
        }
    }

    /// Outlier score in (0, 1): 2^(-mean path length / baseline).
    fn score(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| path_length(tree, row, 0)).sum();
        let mean = total / self.trees.len() as f64;
        2f64.powf(-mean / self.baseline)
    }
}

/// Sample row indices without replacement; the whole set when it is small.
fn subsample(rng: &mut StdRng, n: usize, sample_size: usize) -> Vec<usize> {
    if sample_size >= n {
        (0..n).collect()
    } else {
        rand::seq::index::sample(rng, n, sample_size).into_vec()
    }
}

fn build_tree(
    rng: &mut StdRng,
    data: &[[f64; FEATURE_COUNT]],
    rows: &[usize],
    depth: usize,
    height_limit: usize,
) -> Tree {
    if rows.len() <= 1 || depth >= height_limit {
        return Tree::Leaf { size: rows.len() };
    }

    // Only features with spread in this partition can split it
    let splittable: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
        .filter_map(|feature| {
            let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = data[r][feature];
                (lo.min(v), hi.max(v))
            });
            (max > min).then_some((feature, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Tree::Leaf { size: rows.len() };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let value = rng.gen_range(min..max);

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().copied().partition(|&r| data[r][feature] < value);

    Tree::Split {
        feature,
        value,
        left: Box::new(build_tree(rng, data, &left_rows, depth + 1, height_limit)),
        right: Box::new(build_tree(rng, data, &right_rows, depth + 1, height_limit)),
    }
}

fn path_length(tree: &Tree, row: &[f64; FEATURE_COUNT], depth: usize) -> f64 {
    match tree {
        Tree::Leaf { size } => depth as f64 + average_path_length(*size),
        Tree::Split {
            feature,
            value,
            left,
            right,
        } => {
            if row[*feature] < *value {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Expected unsuccessful-search path length in a binary search tree of
/// `n` points: 2 H(n-1) - 2 (n-1)/n.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    let harmonic = (n - 1.0).ln() + EULER_GAMMA;
    2.0 * harmonic - 2.0 * (n - 1.0) / n
}
