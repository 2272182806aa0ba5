use decinet_core::{
    EliminationHeuristic, FactorDef, InferenceError, Network, NetworkDef, SolverConfig,
    VariableDef,
};
use decinet_tests::{assert_close_vec, independent_guesses, product_launch, umbrella};

#[test]
fn umbrella_policy_is_the_argmax_per_forecast() {
    let mut net = Network::new(umbrella()).unwrap();
    let policies = net.solve_policies().unwrap();
    assert_eq!(policies.len(), 1);
    let policy = &policies[0];
    assert_eq!(policy.name, "umbrella");
    assert_eq!(policy.given, vec!["forecast".to_string()]);
    // sunny -> leave, cloudy -> leave, rainy -> take
    assert_eq!(policy.table, vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
    assert_close_vec(
        &policy.expected_utility,
        &[12.95, 49.0, 8.05, 14.0, 14.0, 7.0],
    );
}

#[test]
fn umbrella_expected_utility_given_rainy_forecast() {
    let mut net = Network::new(umbrella()).unwrap();
    let total = net
        .solve_utility(&[("forecast", "rainy")], &["weather"], None)
        .unwrap();
    assert_eq!(total.variables, vec!["weather".to_string()]);
    assert_close_vec(&total.values, &[70.0, 20.0]);

    let single = net
        .solve_utility(&[("forecast", "rainy")], &["weather"], Some("satisfaction"))
        .unwrap();
    assert_close_vec(&single.values, &total.values);
}

#[test]
fn umbrella_overall_expected_utility() {
    let mut net = Network::new(umbrella()).unwrap();
    assert!((net.expected_utility(&[]).unwrap() - 77.0).abs() < 1e-9);
    // resolved implicitly
    assert_eq!(net.policies().len(), 1);
}

#[test]
fn resolved_decisions_can_be_queried() {
    let mut net = Network::new(umbrella()).unwrap();
    let result = net
        .solve_query(&[("forecast", "rainy")], &["umbrella"])
        .unwrap();
    assert_eq!(result[0].1, vec![1.0, 0.0]);
}

#[test]
fn sequential_decisions_resolve_backwards() {
    let mut net = Network::new(product_launch()).unwrap();
    let policies = net.solve_policies().unwrap();
    let names: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["research", "launch"]);

    let research = &policies[0];
    assert!(research.given.is_empty());
    assert_eq!(research.table, vec![1.0, 0.0]);
    assert_close_vec(&research.expected_utility, &[31.0, 20.0]);

    let launch = &policies[1];
    assert_eq!(
        launch.given,
        vec!["research".to_string(), "report".to_string()]
    );
    assert_eq!(
        launch.table,
        vec![
            1.0, 0.0, // buy, positive
            0.0, 1.0, // buy, negative
            0.5, 0.5, // buy, none (impossible)
            0.5, 0.5, // skip, positive (impossible)
            0.5, 0.5, // skip, negative (impossible)
            1.0, 0.0, // skip, none
        ]
    );

    assert!((net.expected_utility(&[]).unwrap() - 31.0).abs() < 1e-9);
}

#[test]
fn policies_are_reinjected_into_queries() {
    let mut net = Network::new(product_launch()).unwrap();
    let result = net.solve_query(&[], &["launch", "report"]).unwrap();
    assert_close_vec(&result[0].1, &[0.6, 0.4]);
    assert_close_vec(&result[1].1, &[0.6, 0.4, 0.0]);
}

#[test]
fn utility_weights_change_the_decision() {
    let config = SolverConfig::default().with_utility_weight("cost", 4.0);
    let mut net = Network::with_config(product_launch(), config).unwrap();
    let policies = net.solve_policies().unwrap();
    assert_eq!(policies[0].table, vec![0.0, 1.0]);
    assert_close_vec(&policies[0].expected_utility, &[16.0, 20.0]);
    assert!((net.expected_utility(&[]).unwrap() - 20.0).abs() < 1e-9);
}

#[test]
fn heuristic_does_not_change_policies() {
    let mut by_degree = Network::new(product_launch()).unwrap();
    let config = SolverConfig::default().with_heuristic(EliminationHeuristic::Declaration);
    let mut by_declaration = Network::with_config(product_launch(), config).unwrap();
    let a = by_degree.solve_policies().unwrap();
    let b = by_declaration.solve_policies().unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.table, y.table);
        assert_close_vec(&x.expected_utility, &y.expected_utility);
    }
}

#[test]
fn cleared_policies_are_solved_again() {
    let mut net = Network::new(umbrella()).unwrap();
    let first = net.solve_policies().unwrap();
    net.clear_policies();
    assert!(net.policies().is_empty());
    let _ = net.solve_query(&[], &["weather"]).unwrap();
    assert_eq!(net.policies(), first.as_slice());
}

#[test]
fn decision_without_consequences_has_no_solution() {
    let def = NetworkDef::new(
        vec![
            VariableDef::chance("x", &["a", "b"]),
            VariableDef::decision("d", &["left", "right"]),
            VariableDef::utility("u"),
        ],
        vec![
            FactorDef::table("x", &[], vec![0.5, 0.5]),
            FactorDef::decision("d", &[]),
            FactorDef::table("u", &["x"], vec![1.0, 2.0]),
        ],
    );
    let mut net = Network::new(def).unwrap();
    assert!(matches!(
        net.solve_policies(),
        Err(InferenceError::NoSolution(_))
    ));
}

#[test]
fn independent_decisions_each_follow_their_own_observation() {
    let mut net = Network::new(independent_guesses()).unwrap();
    let policies = net.solve_policies().unwrap();
    let names: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["guess_x", "guess_y"]);

    assert_eq!(policies[0].given, vec!["x".to_string()]);
    assert_eq!(policies[0].table, vec![1.0, 0.0, 0.0, 1.0]);
    // u_x plus the expected 1 from guess_y; nothing weights x here
    assert_close_vec(&policies[0].expected_utility, &[2.0, 1.0, 1.0, 2.0]);

    assert_eq!(policies[1].given, vec!["y".to_string()]);
    assert_eq!(policies[1].table, vec![1.0, 0.0, 0.0, 1.0]);
    // u_y plus E[u_x | guess_x = a] = P(x = a)
    assert_close_vec(&policies[1].expected_utility, &[1.3, 0.3, 0.3, 1.3]);

    assert!((net.expected_utility(&[]).unwrap() - 2.0).abs() < 1e-9);
}

#[test]
fn policy_over_an_unobserved_decision_is_rejected() {
    // d2 does not observe d1, yet its payoff depends on it.
    let def = NetworkDef::new(
        vec![
            VariableDef::decision("d1", &["a", "b"]),
            VariableDef::decision("d2", &["a", "b"]),
            VariableDef::utility("match"),
        ],
        vec![
            FactorDef::decision("d1", &[]),
            FactorDef::decision("d2", &[]),
            FactorDef::table("match", &["d1", "d2"], vec![1.0, 0.0, 0.0, 2.0]),
        ],
    );
    let mut net = Network::new(def).unwrap();
    assert!(matches!(
        net.solve_policies(),
        Err(InferenceError::ValidationError(_))
    ));
}
