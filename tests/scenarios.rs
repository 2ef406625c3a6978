//! End-to-end scenarios, from document text to products and validation.

use std::time::Duration;

use mwp_rs::analysis::Analysis;
use mwp_rs::error::{Diagnostic, Error};
use mwp_rs::record::ErrorResponse;
use mwp_rs::search::{FeatureSet, SearchConfig, SearchStatus, Strategy};
use mwp_rs::validate::SelectionReport;
use num_bigint::BigUint;

const CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<featureModel>
  <feature name="App">
    <feature name="Catalog" mandatory="true">
      <feature name="Filtered" mandatory="true" group="or">
        <feature name="ByDiscount"/>
        <feature name="ByWeather"/>
        <feature name="ByLocation"/>
      </feature>
    </feature>
  </feature>
</featureModel>"#;

const CATALOG_WITH_LOCATION: &str = r#"<featureModel>
  <feature name="App">
    <feature name="Catalog" mandatory="true">
      <feature name="Filtered" mandatory="true" group="or">
        <feature name="ByDiscount"/>
        <feature name="ByWeather"/>
        <feature name="ByLocation"/>
      </feature>
      <feature name="Location"/>
    </feature>
  </feature>
  <constraints>
    <constraint>
      <englishStatement>ByLocation requires Location</englishStatement>
    </constraint>
  </constraints>
</featureModel>"#;

const TIERS: &str = r#"<featureModel>
  <feature name="App">
    <feature name="Tier" mandatory="true" group="xor">
      <feature name="Gold"/>
      <feature name="Silver"/>
      <feature name="Bronze"/>
    </feature>
  </feature>
</featureModel>"#;

fn set(names: &[&str]) -> FeatureSet {
    names.iter().copied().collect()
}

fn configs() -> Vec<SearchConfig> {
    vec![
        SearchConfig::default(),
        SearchConfig::default().with_strategy(Strategy::BruteForce),
        SearchConfig::default()
            .with_strategy(Strategy::BruteForce)
            .with_mandatory_pruning(false),
    ]
}

// ─── Catalog With OR Group ─────────────────────────────────────────────────────

#[test]
fn catalog_products_have_core_and_one_filter() {
    let analysis = Analysis::from_xml(CATALOG).unwrap();
    for config in configs() {
        let report = analysis.search(&config);
        assert!(report.is_complete());
        assert_eq!(report.products.len(), 7, "{:?}", config);
        for product in &report.products {
            for core in ["App", "Catalog", "Filtered"] {
                assert!(product.contains(core));
            }
            assert!(["ByDiscount", "ByWeather", "ByLocation"]
                .iter()
                .any(|f| product.contains(f)));
        }
        assert!(!report.products.contains(&set(&["App", "Catalog", "Filtered"])));
    }
}

#[test]
fn catalog_products_come_smallest_first() {
    let analysis = Analysis::from_xml(CATALOG).unwrap();
    let report = analysis.search(&SearchConfig::default());
    let sizes: Vec<usize> = report.products.iter().map(FeatureSet::len).collect();
    assert_eq!(sizes, vec![4, 4, 4, 5, 5, 5, 6]);
    assert_eq!(report.products[0], set(&["App", "Catalog", "Filtered", "ByDiscount"]));
    assert_eq!(
        report.products[6],
        set(&["App", "Catalog", "Filtered", "ByDiscount", "ByWeather", "ByLocation"])
    );
}

#[test]
fn catalog_minimal_products() {
    let analysis = Analysis::from_xml(CATALOG).unwrap();
    let report = analysis.search(&SearchConfig::default().with_minimal_only(true));
    assert_eq!(
        report.products,
        vec![
            set(&["App", "Catalog", "Filtered", "ByDiscount"]),
            set(&["App", "Catalog", "Filtered", "ByWeather"]),
            set(&["App", "Catalog", "Filtered", "ByLocation"]),
        ]
    );
}

#[test]
fn catalog_pruning_only_changes_work_done() {
    let analysis = Analysis::from_xml(CATALOG).unwrap();
    let brute = SearchConfig::default().with_strategy(Strategy::BruteForce);
    let pruned = analysis.search(&brute);
    let full = analysis.search(&brute.clone().with_mandatory_pruning(false));
    assert_eq!(pruned.products, full.products);
    assert_eq!(pruned.stats.candidates_explored, 8);
    assert_eq!(full.stats.candidates_explored, 64);
    assert_eq!(pruned.stats.search_space, BigUint::from(8u32));
}

// ─── Cross-Tree Requires ───────────────────────────────────────────────────────

#[test]
fn by_location_requires_location() {
    let analysis = Analysis::from_xml(CATALOG_WITH_LOCATION).unwrap();
    assert_eq!(analysis.rules().constraints, vec!["ByLocation -> Location"]);
    assert!(analysis.diagnostics().is_empty());

    for config in configs() {
        let report = analysis.search(&config);
        assert!(!report.products.is_empty());
        for product in &report.products {
            assert!(!product.contains("ByLocation") || product.contains("Location"));
        }
        assert!(report
            .products
            .contains(&set(&["App", "Catalog", "Filtered", "ByLocation", "Location"])));
        assert!(!report
            .products
            .contains(&set(&["App", "Catalog", "Filtered", "ByLocation"])));
    }
}

#[test]
fn by_location_count_matches_enumeration() {
    let analysis = Analysis::from_xml(CATALOG_WITH_LOCATION).unwrap();
    let report = analysis.search(&SearchConfig::default());
    // 7 filter choices times optional Location, minus the 4 with ByLocation but no Location.
    assert_eq!(report.products.len(), 10);
    assert_eq!(analysis.count(), BigUint::from(10u32));
}

// ─── XOR Tiers ─────────────────────────────────────────────────────────────────

#[test]
fn tier_selects_exactly_one() {
    let analysis = Analysis::from_xml(TIERS).unwrap();
    for config in configs() {
        let report = analysis.search(&config);
        assert_eq!(
            report.products,
            vec![
                set(&["App", "Tier", "Gold"]),
                set(&["App", "Tier", "Silver"]),
                set(&["App", "Tier", "Bronze"]),
            ]
        );
    }
}

#[test]
fn tier_engine_rejects_two_or_zero() {
    let analysis = Analysis::from_xml(TIERS).unwrap();
    let two = analysis.check_selection(["App", "Tier", "Gold", "Silver"]);
    assert!(!two.is_valid);
    assert_eq!(two.violated.len(), 1);
    assert!(two.violated[0].starts_with("Tier -> "));

    let zero = analysis.check_selection(["App", "Tier"]);
    assert!(!zero.is_valid);
}

#[test]
fn tier_validator_flags_two_or_zero() {
    let analysis = Analysis::from_xml(TIERS).unwrap();
    let catalog = analysis.catalog();
    let expected = vec!["Invalid XOR group: Tier requires exactly one child to be selected.".to_string()];

    let two = SelectionReport::from_selection(&catalog, ["App", "Tier", "Gold", "Silver"]);
    let report = analysis.validate(&two);
    assert!(!report.is_valid);
    assert_eq!(report.messages, expected);

    let zero = SelectionReport::from_selection(&catalog, ["App", "Tier"]);
    assert_eq!(analysis.validate(&zero).messages, expected);

    let one = SelectionReport::from_selection(&catalog, ["App", "Tier", "Bronze"]);
    assert!(analysis.validate(&one).is_valid);
}

#[test]
fn tier_feature_queries() {
    let analysis = Analysis::from_xml(TIERS).unwrap();
    let report = analysis.search(&SearchConfig::default());
    assert_eq!(report.core_features(), vec!["App", "Tier"]);
    assert!(report.dead_features().is_empty());
    let commonality = report.commonality();
    assert_eq!(commonality[0], ("App", 1.0));
    assert!((commonality[2].1 - 1.0 / 3.0).abs() < 1e-9);
}

// ─── Failure Modes ─────────────────────────────────────────────────────────────

#[test]
fn unparsable_constraints_do_not_abort() {
    let xml = r#"<featureModel>
  <feature name="App">
    <feature name="A"/>
    <feature name="B"/>
  </feature>
  <constraints>
    <constraint><englishStatement>A requires B requires A</englishStatement></constraint>
    <constraint><englishStatement>A depends on B</englishStatement></constraint>
    <constraint><booleanExpression>A -> !B</booleanExpression></constraint>
  </constraints>
</featureModel>"#;
    let analysis = Analysis::from_xml(xml).unwrap();
    assert_eq!(analysis.rules().constraints, vec!["A -> !B"]);
    assert_eq!(analysis.diagnostics().len(), 2);

    let report = analysis.search(&SearchConfig::default());
    assert_eq!(
        report.products,
        vec![set(&["App"]), set(&["App", "A"]), set(&["App", "B"])]
    );
}

#[test]
fn broken_rule_is_reported_not_fatal() {
    let xml = r#"<featureModel>
  <feature name="App"><feature name="A"/></feature>
  <constraints>
    <constraint><booleanExpression>A -> (App</booleanExpression></constraint>
  </constraints>
</featureModel>"#;
    let analysis = Analysis::from_xml(xml).unwrap();
    for config in configs() {
        let report = analysis.search(&config);
        assert!(report.is_complete());
        assert!(report.products.is_empty());
        assert_eq!(report.stats.broken_rules, 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::RuleEvaluation { rule, .. } if rule == "A -> (App")));
    }
}

#[test]
fn budget_exceeded_is_distinct() {
    let analysis = Analysis::from_xml(CATALOG).unwrap();
    let report = analysis.search(&SearchConfig::default().with_candidate_budget(2));
    assert_eq!(report.status, SearchStatus::BudgetExceeded { explored: 2 });
    assert_eq!(report.products.len(), 2);

    let report = analysis.search(&SearchConfig::default().with_time_budget(Duration::ZERO));
    assert!(!report.is_complete());
    assert!(report.products.is_empty());
}

#[test]
fn malformed_documents_are_categorized() {
    let err = Analysis::from_xml("<featureModel><feature name=\"App\">").unwrap_err();
    assert_eq!(ErrorResponse::from(&err).error, "Invalid XML file");

    let err = Analysis::from_xml("<featureModel></featureModel>").unwrap_err();
    assert_eq!(err, Error::MissingRootFeature);
}

#[test]
fn analysis_is_idempotent() {
    let first = Analysis::from_xml(CATALOG_WITH_LOCATION).unwrap();
    let second = Analysis::from_xml(CATALOG_WITH_LOCATION).unwrap();
    assert_eq!(first.rules(), second.rules());
    let config = SearchConfig::default();
    assert_eq!(first.search(&config).products, second.search(&config).products);
}
