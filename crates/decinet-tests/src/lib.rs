//! Shared networks and assertions for the decinet test suites.

use decinet_core::{FactorDef, NetworkDef, VariableDef};

/// Tolerance used by [`assert_close_vec`].
pub const TOLERANCE: f64 = 1e-9;

pub fn assert_close_vec(actual: &[f64], expected: &[f64]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "length mismatch: {:?} vs {:?}",
        actual,
        expected
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() < TOLERANCE,
            "cell {} differs: {:?} vs {:?}",
            i,
            actual,
            expected
        );
    }
}

/// Rain influences the sprinkler, the sprinkler wets the grass.
pub fn sprinkler() -> NetworkDef {
    NetworkDef::new(
        vec![
            VariableDef::chance("rain", &["yes", "no"]),
            VariableDef::chance("sprinkler", &["yes", "no"]),
            VariableDef::chance("grass_wet", &["yes", "no"]),
        ],
        vec![
            FactorDef::table("rain", &[], vec![0.2, 0.8]),
            FactorDef::table("sprinkler", &["rain"], vec![0.01, 0.99, 0.4, 0.6]),
            FactorDef::table("grass_wet", &["sprinkler"], vec![0.9, 0.1, 0.0, 1.0]),
        ],
    )
}

/// Take the umbrella or not, having seen the forecast.
pub fn umbrella() -> NetworkDef {
    NetworkDef::new(
        vec![
            VariableDef::chance("weather", &["rainy", "sunny"]),
            VariableDef::chance("forecast", &["sunny", "cloudy", "rainy"]),
            VariableDef::decision("umbrella", &["take", "leave"]),
            VariableDef::utility("satisfaction"),
        ],
        vec![
            FactorDef::table("weather", &[], vec![0.3, 0.7]),
            FactorDef::table(
                "forecast",
                &["weather"],
                vec![0.15, 0.25, 0.6, 0.7, 0.2, 0.1],
            ),
            FactorDef::decision("umbrella", &["forecast"]),
            FactorDef::table(
                "satisfaction",
                &["weather", "umbrella"],
                vec![70.0, 0.0, 20.0, 100.0],
            ),
        ],
    )
}

/// Two sequential decisions: buy market research, then launch a product
/// having seen the research report.
///
/// Without research the launch is worth 20. Research costs 5 and lifts the
/// expected total to 31.
pub fn product_launch() -> NetworkDef {
    NetworkDef::new(
        vec![
            VariableDef::chance("market", &["good", "bad"]),
            VariableDef::decision("research", &["buy", "skip"]),
            VariableDef::chance("report", &["positive", "negative", "none"]),
            VariableDef::decision("launch", &["launch", "hold"]),
            VariableDef::utility("profit"),
            VariableDef::utility("cost"),
        ],
        vec![
            FactorDef::table("market", &[], vec![0.6, 0.4]),
            FactorDef::decision("research", &[]),
            FactorDef::table(
                "report",
                &["market", "research"],
                vec![
                    0.8, 0.2, 0.0, // good, buy
                    0.0, 0.0, 1.0, // good, skip
                    0.3, 0.7, 0.0, // bad, buy
                    0.0, 0.0, 1.0, // bad, skip
                ],
            ),
            FactorDef::decision("launch", &["research", "report"]),
            FactorDef::table(
                "profit",
                &["market", "launch"],
                vec![100.0, 0.0, -100.0, 0.0],
            ),
            FactorDef::table("cost", &["research"], vec![-5.0, 0.0]),
        ],
    )
}

/// Two decisions that do not observe each other. `guess_x` sees `x`,
/// `guess_y` sees `y`, and each earns 1 for naming what it saw.
pub fn independent_guesses() -> NetworkDef {
    NetworkDef::new(
        vec![
            VariableDef::chance("x", &["a", "b"]),
            VariableDef::chance("y", &["a", "b"]),
            VariableDef::decision("guess_x", &["a", "b"]),
            VariableDef::decision("guess_y", &["a", "b"]),
            VariableDef::utility("u_x"),
            VariableDef::utility("u_y"),
        ],
        vec![
            FactorDef::table("x", &[], vec![0.3, 0.7]),
            FactorDef::table("y", &[], vec![0.6, 0.4]),
            FactorDef::decision("guess_x", &["x"]),
            FactorDef::decision("guess_y", &["y"]),
            FactorDef::table("u_x", &["x", "guess_x"], vec![1.0, 0.0, 0.0, 1.0]),
            FactorDef::table("u_y", &["y", "guess_y"], vec![1.0, 0.0, 0.0, 1.0]),
        ],
    )
}

/// A chain `x0 -> x1 -> ... -> x{len-1}` of binary variables where each
/// variable copies its parent with probability `keep`.
pub fn copy_chain(len: usize, keep: f64) -> NetworkDef {
    let mut variables = Vec::with_capacity(len);
    let mut factors = Vec::with_capacity(len);
    for i in 0..len {
        let name = format!("x{}", i);
        variables.push(VariableDef::chance(name.clone(), &["on", "off"]));
        if i == 0 {
            factors.push(FactorDef::table(name, &[], vec![0.5, 0.5]));
        } else {
            let parent = format!("x{}", i - 1);
            factors.push(FactorDef::table(
                name,
                &[parent.as_str()],
                vec![keep, 1.0 - keep, 1.0 - keep, keep],
            ));
        }
    }
    NetworkDef::new(variables, factors)
}
