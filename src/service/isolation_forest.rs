//! 隔离森林 (Isolation Forest)
//!
//! 每棵树在不放回抽取的子样本上随机选特征、在 [min, max) 内随机选切分点，
//! 直到样本被隔离或达到深度上限 ceil(log2(子样本数))。
//! 样本越早被隔离 (平均路径越短) 越异常。
//!
//! 分数约定:
//! - `score_samples` = -2^(-E[h(x)] / c(子样本数))，取值 [-1, 0)，越负越异常
//! - `offset` = 训练样本分数的 100 * contamination 分位数
//! - `decision_function` = score_samples - offset，< 0 判为异常

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{EngineError, Result};
use crate::service::stats::percentile;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// 森林参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(EngineError::InvalidContamination(self.contamination));
        }
        if self.n_estimators == 0 {
            return Err(EngineError::InvalidParameter("n_estimators must be >= 1".into()));
        }
        if self.max_samples == 0 {
            return Err(EngineError::InvalidParameter("max_samples must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn fit(data: &[Vec<f64>], sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow(data, sample, 0, max_depth, rng),
        }
    }

    fn path_length(&self, x: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                Node::Leaf { size } => return depth as f64 + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { &**left } else { &**right };
                    depth += 1;
                }
            }
        }
    }
}

fn grow(data: &[Vec<f64>], rows: Vec<usize>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
    if rows.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: rows.len() };
    }

    // 只在本节点内非常量的特征上切分
    let n_features = data[rows[0]].len();
    let candidates: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|f| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                (lo.min(data[r][f]), hi.max(data[r][f]))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(lo..hi);

    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&r| data[r][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(data, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(data, right, depth + 1, max_depth, rng)),
    }
}

/// c(n): n 个样本的二叉搜索树未命中平均路径长度
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// 已拟合的森林，只存在于单次检测调用内
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// 拟合并按 contamination 校准决策边界
    pub fn fit(data: &[Vec<f64>], params: &ForestParams) -> Result<Self> {
        params.validate()?;
        if data.is_empty() {
            return Err(EngineError::InvalidParameter("cannot fit on an empty batch".into()));
        }

        let n = data.len();
        let sample_size = params.max_samples.min(n);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        // 先按顺序派生每棵树的种子，保证并行构建结果与线程调度无关
        let mut master = StdRng::seed_from_u64(params.seed);
        let tree_seeds: Vec<u64> = (0..params.n_estimators).map(|_| master.gen()).collect();

        let trees: Vec<IsolationTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::fit(data, sample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };

        let train_scores: Vec<f64> = data.par_iter().map(|x| forest.score_samples(x)).collect();
        forest.offset = percentile(&train_scores, 100.0 * params.contamination).unwrap_or(-0.5);
        tracing::debug!(
            "[IsolationForest] {} trees, sample size {}, offset {:.6}",
            forest.trees.len(),
            sample_size,
            forest.offset
        );

        Ok(forest)
    }

    /// 原始异常分数，越负越异常
    pub fn score_samples(&self, x: &[f64]) -> f64 {
        let mean_depth =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return -1.0;
        }
        -(2f64.powf(-mean_depth / norm))
    }

    /// 决策分数，< 0 为异常
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.score_samples(x) - self.offset
    }

    /// true = 异常
    pub fn predict(&self, x: &[f64]) -> bool {
        self.decision_function(x) < 0.0
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }
}
