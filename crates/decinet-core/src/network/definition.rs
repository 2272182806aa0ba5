//! Declarative network definitions.
//!
//! These are the structures an external compiler (YAML, XML, JSON...) hands
//! to [`crate::network::Network`]. Tables are flat and row-major over the
//! `given` variables followed by the target, target varying fastest.

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableDef {
    pub name: String,
    /// `chance`, `decision` or `utility`.
    pub kind: String,
    /// Outcome names in table order. May be left empty for utility nodes.
    #[cfg_attr(feature = "serde", serde(default))]
    pub outcomes: Vec<String>,
}

impl VariableDef {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, outcomes: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            outcomes: outcomes.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn chance(name: impl Into<String>, outcomes: &[&str]) -> Self {
        Self::new(name, "chance", outcomes)
    }

    pub fn decision(name: impl Into<String>, outcomes: &[&str]) -> Self {
        Self::new(name, "decision", outcomes)
    }

    pub fn utility(name: impl Into<String>) -> Self {
        Self::new(name, "utility", &[])
    }
}

/// A conditional table (chance, utility) or an information set (decision).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactorDef {
    /// Variable the table is for.
    #[cfg_attr(feature = "serde", serde(rename = "for"))]
    pub target: String,
    /// Parents, outermost axis first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub given: Vec<String>,
    /// Flat table; absent for decisions.
    #[cfg_attr(feature = "serde", serde(default))]
    pub table: Option<Vec<f64>>,
}

impl FactorDef {
    pub fn table(target: impl Into<String>, given: &[&str], table: Vec<f64>) -> Self {
        Self {
            target: target.into(),
            given: given.iter().map(|g| g.to_string()).collect(),
            table: Some(table),
        }
    }

    /// Information set of a decision: the variables observed before it.
    pub fn decision(target: impl Into<String>, given: &[&str]) -> Self {
        Self {
            target: target.into(),
            given: given.iter().map(|g| g.to_string()).collect(),
            table: None,
        }
    }
}

/// A complete network definition.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkDef {
    pub variables: Vec<VariableDef>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub factors: Vec<FactorDef>,
}

impl NetworkDef {
    pub fn new(variables: Vec<VariableDef>, factors: Vec<FactorDef>) -> Self {
        Self { variables, factors }
    }
}
