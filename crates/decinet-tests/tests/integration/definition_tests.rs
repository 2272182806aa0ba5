use decinet_core::{
    compile, FactorDef, InferenceError, Network, NetworkDef, NodeKind, SolverConfig, VariableDef,
};
use decinet_tests::{sprinkler, umbrella};

fn two_coins(factors: Vec<FactorDef>) -> NetworkDef {
    NetworkDef::new(
        vec![
            VariableDef::chance("a", &["h", "t"]),
            VariableDef::chance("b", &["h", "t"]),
        ],
        factors,
    )
}

#[test]
fn compile_resolves_names_and_kinds() {
    let net = compile(umbrella()).unwrap();
    assert_eq!(net.kind("umbrella").unwrap(), NodeKind::Decision);
    assert_eq!(net.kind("satisfaction").unwrap(), NodeKind::Utility);
    assert_eq!(net.outcome_names("satisfaction").unwrap(), &["value".to_string()]);
    assert_eq!(net.outcome_index("forecast", "rainy").unwrap(), 2);
    assert_eq!(net.parents("satisfaction").unwrap(), vec!["weather", "umbrella"]);
    // decisions carry no factor
    assert_eq!(net.factors().len(), 3);
}

#[test]
fn chance_tables_are_normalized_per_parent_state() {
    let def = two_coins(vec![
        FactorDef::table("a", &[], vec![3.0, 1.0]),
        FactorDef::table("b", &["a"], vec![2.0, 2.0, 0.0, 5.0]),
    ]);
    let net = Network::new(def.clone()).unwrap();
    assert_eq!(net.factors()[0].data(), &[0.75, 0.25]);
    assert_eq!(net.factors()[1].data(), &[0.5, 0.5, 0.0, 1.0]);

    let config = SolverConfig {
        normalize_chance_tables: false,
        ..SolverConfig::default()
    };
    let raw = Network::with_config(def, config).unwrap();
    assert_eq!(raw.factors()[0].data(), &[3.0, 1.0]);
}

#[test]
fn unknown_names_are_reported() {
    let def = two_coins(vec![
        FactorDef::table("a", &[], vec![0.5, 0.5]),
        FactorDef::table("b", &["c"], vec![0.5; 4]),
    ]);
    assert_eq!(
        Network::new(def).unwrap_err(),
        InferenceError::UnknownVariable("c".into())
    );

    let mut net = compile(sprinkler()).unwrap();
    assert_eq!(
        net.solve_query(&[], &["hail"]).unwrap_err(),
        InferenceError::UnknownVariable("hail".into())
    );
}

#[test]
fn unsupported_kind_is_rejected() {
    let def = NetworkDef::new(vec![VariableDef::new("x", "nature", &["a"])], vec![]);
    assert_eq!(
        Network::new(def).unwrap_err(),
        InferenceError::UnsupportedKind("nature".into())
    );
}

#[test]
fn duplicate_names_are_rejected() {
    let def = NetworkDef::new(
        vec![
            VariableDef::chance("a", &["h", "t"]),
            VariableDef::chance("a", &["h", "t"]),
        ],
        vec![],
    );
    assert_eq!(
        Network::new(def).unwrap_err(),
        InferenceError::DuplicateVariable("a".into())
    );
}

#[test]
fn table_length_must_match_cardinalities() {
    let def = two_coins(vec![
        FactorDef::table("a", &[], vec![0.5, 0.5]),
        FactorDef::table("b", &["a"], vec![0.5, 0.5, 0.5]),
    ]);
    assert_eq!(
        Network::new(def).unwrap_err(),
        InferenceError::SizeMismatch {
            expected: 4,
            actual: 3
        }
    );
}

#[test]
fn tables_must_match_node_kinds() {
    let missing = two_coins(vec![FactorDef::table("a", &[], vec![0.5, 0.5])]);
    assert!(matches!(
        Network::new(missing),
        Err(InferenceError::ValidationError(_))
    ));

    let mut def = umbrella();
    def.factors[2] = FactorDef::table("umbrella", &["forecast"], vec![0.5; 6]);
    assert!(matches!(
        Network::new(def),
        Err(InferenceError::ValidationError(_))
    ));

    let twice = two_coins(vec![
        FactorDef::table("a", &[], vec![0.5, 0.5]),
        FactorDef::table("b", &[], vec![0.5, 0.5]),
        FactorDef::table("b", &["a"], vec![0.5; 4]),
    ]);
    assert!(matches!(
        Network::new(twice),
        Err(InferenceError::ValidationError(_))
    ));
}

#[test]
fn cyclic_graph_fails_with_a_specific_error() {
    let def = NetworkDef::new(
        vec![
            VariableDef::chance("a", &["h", "t"]),
            VariableDef::chance("b", &["h", "t"]),
            VariableDef::chance("c", &["h", "t"]),
        ],
        vec![
            FactorDef::table("a", &["c"], vec![0.5; 4]),
            FactorDef::table("b", &["a"], vec![0.5; 4]),
            FactorDef::table("c", &["b"], vec![0.5; 4]),
        ],
    );
    let err = Network::new(def).unwrap_err();
    assert_eq!(err, InferenceError::CyclicGraph);
    assert_eq!(err.to_string(), "graph has cycles");
}

#[test]
fn topological_order_is_stable() {
    let def = NetworkDef::new(
        vec![
            VariableDef::chance("late", &["y", "n"]),
            VariableDef::chance("root", &["y", "n"]),
            VariableDef::chance("other", &["y", "n"]),
        ],
        vec![
            FactorDef::table("late", &["root"], vec![0.5; 4]),
            FactorDef::table("root", &[], vec![0.5, 0.5]),
            FactorDef::table("other", &[], vec![0.5, 0.5]),
        ],
    );
    let net = Network::new(def).unwrap();
    assert_eq!(net.topological_order(), vec!["root", "other", "late"]);
}

#[test]
fn utility_weights_must_name_utilities() {
    let config = SolverConfig::default().with_utility_weight("weather", 2.0);
    assert!(matches!(
        Network::with_config(umbrella(), config),
        Err(InferenceError::ValidationError(_))
    ));

    let config = SolverConfig::default().with_utility_weight("satisfaction", f64::NAN);
    assert!(matches!(
        Network::with_config(umbrella(), config),
        Err(InferenceError::Numerical(_))
    ));
}

#[test]
fn definitions_load_from_json() {
    let json = r#"{
        "variables": [
            {"name": "rain", "kind": "chance", "outcomes": ["yes", "no"]},
            {"name": "take", "kind": "decision", "outcomes": ["yes", "no"]},
            {"name": "comfort", "kind": "utility"}
        ],
        "factors": [
            {"for": "rain", "table": [0.4, 0.6]},
            {"for": "take"},
            {"for": "comfort", "given": ["rain", "take"], "table": [10, -20, -5, 5]}
        ]
    }"#;
    let def: NetworkDef = serde_json::from_str(json).unwrap();
    assert_eq!(def.factors[0].target, "rain");
    assert!(def.factors[0].given.is_empty());
    assert!(def.factors[1].table.is_none());

    let mut net = Network::new(def).unwrap();
    let policies = net.solve_policies().unwrap();
    // take: 0.4 * 10 + 0.6 * -5 = 1, leave: 0.4 * -20 + 0.6 * 5 = -5
    assert_eq!(policies[0].table, vec![1.0, 0.0]);
}

#[test]
fn config_loads_from_json() {
    let json = r#"{"heuristic": "declaration", "utility_weights": [["satisfaction", 0.5]]}"#;
    let config: SolverConfig = serde_json::from_str(json).unwrap();
    assert!(config.normalize_chance_tables);
    assert_eq!(config.utility_weights, vec![("satisfaction".to_string(), 0.5)]);
    assert!(Network::with_config(umbrella(), config).is_ok());
}
