use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rb_tree::RbTree;

const DEFAULT_OPS: usize = 100_000;

const DEFAULT_SEED: [u8; 32] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    27, 28, 29, 30, 31, 32,
];

/// Benchmark settings, read from `RB_TREE_OPS` and `RB_TREE_SEED`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BenchConfig {
    ops: usize,
    seed: Option<u64>,
}

impl BenchConfig {
    fn from_env() -> Self {
        BenchConfig {
            ops: parse_var("RB_TREE_OPS", std::env::var("RB_TREE_OPS").ok())
                .unwrap_or(DEFAULT_OPS),
            seed: parse_var("RB_TREE_SEED", std::env::var("RB_TREE_SEED").ok()),
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_seed(DEFAULT_SEED),
        }
    }
}

/// Unset and unparseable values both yield `None`; the latter with a warning.
fn parse_var<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    raw.trim()
        .parse()
        .map_err(|_| warn!("ignoring {name}={raw:?}: not a valid number"))
        .ok()
}

fn bench_ours(config: &BenchConfig) -> (Duration, usize) {
    let mut rng = config.rng();
    let start = Instant::now();
    let mut tree = RbTree::with_capacity(config.ops);
    for _ in 0..config.ops {
        let key: i64 = rng.gen();
        tree.insert_node(key);
    }
    let peak = tree.len();
    let keys: Vec<i64> = tree.in_order_keys().into_iter().copied().collect();
    for k in keys {
        tree.delete_node(&k);
    }
    debug_assert!(tree.is_empty());
    (start.elapsed(), peak)
}

fn bench_std(config: &BenchConfig) -> (Duration, usize) {
    let mut rng = config.rng();
    let start = Instant::now();
    let mut set = BTreeSet::new();
    for _ in 0..config.ops {
        let key: i64 = rng.gen();
        set.insert(key);
    }
    let peak = set.len();
    let keys: Vec<i64> = set.iter().copied().collect();
    for k in keys {
        set.remove(&k);
    }
    (start.elapsed(), peak)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BenchConfig::from_env();
    info!("{} random keys, seed {:?}", config.ops, config.seed);

    let (our_time, our_len) = bench_ours(&config);
    let (std_time, std_len) = bench_std(&config);
    if our_len != std_len {
        warn!("distinct key count differs: ours={our_len}, std={std_len}");
    }

    info!("Our RbTree:   {:?}", our_time);
    info!("Std BTreeSet: {:?}", std_time);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(parse_var::<usize>("X", None), None);
        assert_eq!(parse_var::<usize>("X", Some("42".to_string())), Some(42));
        assert_eq!(parse_var::<usize>("X", Some(" 9 ".to_string())), Some(9));
        assert_eq!(parse_var::<usize>("X", Some("many".to_string())), None);
        assert_eq!(parse_var::<u64>("X", Some("-1".to_string())), None);
    }

    // The only test touching these variables, so no other test races it.
    #[test]
    fn test_from_env_falls_back_to_defaults() {
        std::env::set_var("RB_TREE_SEED", "bogus");
        std::env::set_var("RB_TREE_OPS", "lots");
        let config = BenchConfig::from_env();
        assert_eq!(config.seed, None);
        assert_eq!(config.ops, DEFAULT_OPS);

        std::env::set_var("RB_TREE_SEED", "17");
        std::env::set_var("RB_TREE_OPS", "250");
        let config = BenchConfig::from_env();
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.ops, 250);

        std::env::remove_var("RB_TREE_SEED");
        std::env::remove_var("RB_TREE_OPS");
        assert_eq!(
            BenchConfig::from_env(),
            BenchConfig {
                ops: DEFAULT_OPS,
                seed: None,
            }
        );
    }

    #[test]
    fn test_seeded_runs_agree() {
        let config = BenchConfig {
            ops: 2000,
            seed: Some(11),
        };
        let (_, ours) = bench_ours(&config);
        let (_, theirs) = bench_std(&config);
        assert_eq!(ours, theirs);
        assert!(ours > 0);

        let default_seed = BenchConfig { ops: 500, seed: None };
        assert_eq!(bench_ours(&default_seed).1, bench_std(&default_seed).1);
    }
}
