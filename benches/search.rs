//! MWP search benchmarks.
//!
//! Compares the subset walk with the solver-backed enumeration on generated
//! models of growing size.
//!
//! Run with:
//! ```bash
//! cargo bench --bench search
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mwp_rs::feature::{Feature, GroupType};
use mwp_rs::search::{RuleBase, SearchConfig, Strategy};
use mwp_rs::translate::{translate, RuleSet};

// ============================================================================
// Helper: generated product line
// ============================================================================

/// A root with `groups` mandatory children, alternating OR and XOR over three
/// leaves each, plus one `requires` link between neighbouring groups.
fn product_line(groups: usize) -> (Feature, RuleSet) {
    let mut root = Feature::new("Root").mandatory();
    for g in 0..groups {
        let kind = if g % 2 == 0 { GroupType::Or } else { GroupType::Xor };
        let mut group = Feature::new(format!("G{}", g)).mandatory().with_group(kind);
        for leaf in 0..3 {
            group.add_child(Feature::new(format!("G{}L{}", g, leaf)));
        }
        root.add_child(group);
    }
    let links = (1..groups).map(|g| format!("G{}L0 -> G{}L1", g - 1, g));
    let rules = translate(&root).with_constraints(links);
    (root, rules)
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for groups in [2, 3, 4] {
        let (root, rules) = product_line(groups);
        let base = RuleBase::compile(&rules);
        let forced = root.forced_names();

        for (label, strategy) in [("brute", Strategy::BruteForce), ("sat", Strategy::Sat)] {
            let config = SearchConfig::default().with_strategy(strategy);
            group.bench_with_input(BenchmarkId::new(label, groups), &config, |b, config| {
                b.iter(|| base.search(&forced, config).products.len());
            });
        }
    }

    group.finish();
}

fn bench_pruning(c: &mut Criterion) {
    let mut group = c.benchmark_group("pruning");
    group.sample_size(10);

    let (root, rules) = product_line(3);
    let base = RuleBase::compile(&rules);
    let forced = root.forced_names();

    for pruning in [false, true] {
        let config = SearchConfig::default()
            .with_strategy(Strategy::BruteForce)
            .with_mandatory_pruning(pruning);
        group.bench_with_input(BenchmarkId::new("brute", pruning), &config, |b, config| {
            b.iter(|| base.search(&forced, config).stats.candidates_explored);
        });
    }

    group.finish();
}

fn bench_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("count");

    for groups in [4, 8, 12] {
        let (_, rules) = product_line(groups);
        let base = RuleBase::compile(&rules);
        group.bench_with_input(BenchmarkId::new("dpll", groups), &base, |b, base| {
            b.iter(|| base.count());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_pruning, bench_count);
criterion_main!(benches);
