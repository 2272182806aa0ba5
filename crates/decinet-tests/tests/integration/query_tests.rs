use decinet_core::{EliminationHeuristic, InferenceError, Network, SolverConfig};
use decinet_tests::{assert_close_vec, copy_chain, sprinkler, umbrella};

#[test]
fn sprinkler_is_certain_when_rain_is_ruled_out() {
    let mut net = Network::new(sprinkler()).unwrap();
    let result = net
        .solve_query(&[("rain", "no"), ("grass_wet", "yes")], &["sprinkler"])
        .unwrap();
    assert_eq!(result, vec![("sprinkler".to_string(), vec![1.0, 0.0])]);
}

#[test]
fn wet_grass_explains_away_rain() {
    let mut net = Network::new(sprinkler()).unwrap();
    let result = net.solve_query(&[("grass_wet", "yes")], &["rain"]).unwrap();
    // rain: 0.2 * 0.01 * 0.9, no rain: 0.8 * 0.4 * 0.9
    let yes = 0.2 * 0.01 * 0.9;
    let no = 0.8 * 0.4 * 0.9;
    assert_close_vec(&result[0].1, &[yes / (yes + no), no / (yes + no)]);
}

#[test]
fn results_follow_query_order() {
    let mut net = Network::new(sprinkler()).unwrap();
    let result = net
        .solve_query(&[("rain", "yes")], &["grass_wet", "rain", "sprinkler"])
        .unwrap();
    let names: Vec<&str> = result.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["grass_wet", "rain", "sprinkler"]);
    assert_eq!(result[1].1, vec![1.0, 0.0]);
    assert_close_vec(&result[2].1, &[0.01, 0.99]);
    assert_close_vec(&result[0].1, &[0.009, 0.991]);
}

#[test]
fn joint_is_unnormalized() {
    let mut net = Network::new(sprinkler()).unwrap();
    let joint = net.joint(&[("rain", "no")], &["grass_wet"]).unwrap();
    assert_close_vec(joint.data(), &[0.288, 0.512]);
    assert!((joint.total() - 0.8).abs() < 1e-12);
}

#[test]
fn heuristics_agree_on_a_long_chain() {
    // x0 and x5 agree when an even number of the five links flip.
    let expected = (1.0 + 0.8_f64.powi(5)) / 2.0;
    for heuristic in [EliminationHeuristic::MinDegree, EliminationHeuristic::Declaration] {
        let config = SolverConfig::default().with_heuristic(heuristic);
        let mut net = Network::with_config(copy_chain(6, 0.9), config).unwrap();
        let result = net.solve_query(&[("x5", "on")], &["x0"]).unwrap();
        assert_close_vec(&result[0].1, &[expected, 1.0 - expected]);
    }
}

#[test]
fn repeated_solves_are_independent() {
    let mut net = Network::new(sprinkler()).unwrap();
    let first = net.solve_query(&[("grass_wet", "no")], &["rain"]).unwrap();
    let _ = net.solve_query(&[("rain", "yes")], &["sprinkler"]).unwrap();
    let again = net.solve_query(&[("grass_wet", "no")], &["rain"]).unwrap();
    assert_eq!(first, again);
}

#[test]
fn replacing_a_table_changes_answers() {
    let mut net = Network::new(sprinkler()).unwrap();
    net.replace_table("sprinkler", vec![0.5, 0.5, 0.5, 0.5])
        .unwrap();
    let result = net.solve_query(&[("rain", "no")], &["sprinkler"]).unwrap();
    assert_close_vec(&result[0].1, &[0.5, 0.5]);

    assert_eq!(
        net.replace_table("hail", vec![1.0]).unwrap_err(),
        InferenceError::UnknownVariable("hail".into())
    );
}

#[test]
fn bad_queries_are_rejected() {
    let mut net = Network::new(umbrella()).unwrap();
    let cases: Vec<(Vec<(&str, &str)>, Vec<&str>)> = vec![
        (vec![("weather", "rainy"), ("weather", "sunny")], vec!["forecast"]),
        (vec![], vec!["satisfaction"]),
        (vec![], vec!["weather", "weather"]),
        (vec![("satisfaction", "value")], vec!["weather"]),
    ];
    for (evidence, queries) in cases {
        assert!(matches!(
            net.solve_query(&evidence, &queries),
            Err(InferenceError::ValidationError(_))
        ));
    }

    assert!(matches!(
        net.solve_utility(&[("weather", "rainy")], &["weather"], None),
        Err(InferenceError::ValidationError(_))
    ));
    assert!(matches!(
        net.solve_utility(&[], &[], Some("weather")),
        Err(InferenceError::ValidationError(_))
    ));
}

#[test]
fn repeated_identical_evidence_is_accepted() {
    let mut net = Network::new(sprinkler()).unwrap();
    let result = net
        .solve_query(&[("rain", "no"), ("rain", "no")], &["sprinkler"])
        .unwrap();
    assert_close_vec(&result[0].1, &[0.4, 0.6]);
}
