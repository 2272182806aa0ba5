//! # Networks
//!
//! A [`Network`] is a compiled [`NetworkDef`]: names resolved to registry
//! variables, tables checked and turned into factors, and decisions recorded
//! together with the variables they observe.
//!
//! Every solve runs on a copy of the registry and the compiled factors, so a
//! solve never sees another solve's eliminated or relabeled state. Decisions
//! are resolved on demand: the first query on a network with unresolved
//! decisions runs [`Network::solve_policies`], and the stored policies are
//! fed back as fixed conditional tables from then on.

pub mod definition;
pub mod topology;

use rustc_hash::FxHashMap;

use crate::engine::algebra;
use crate::engine::config::SolverConfig;
use crate::engine::dependencies::DependencyMap;
use crate::engine::elimination::{Eliminator, Evidence, SolveTarget};
use crate::engine::errors::InferenceError;
use crate::engine::factor::Factor;
use crate::engine::registry::{NodeKind, Registry, Variable, VariableId};

use definition::NetworkDef;

/// Outcome name given to utility nodes declared without outcomes.
pub const UTILITY_OUTCOME: &str = "value";

/// Optimal decision rule for one decision.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionPolicy {
    pub name: String,
    /// Informational parents, outermost axis first.
    pub given: Vec<String>,
    /// Probability of each decision outcome per parent combination, decision
    /// varying fastest.
    pub table: Vec<f64>,
    /// Table the rule was derived from, same layout. It is the unnormalized
    /// product of the factors relevant to the decision. Utilities carry only
    /// the probabilities folded in while reducing the model (for example
    /// `P(forecast)`) and stay unweighted when none reach the decision.
    pub expected_utility: Vec<f64>,
}

/// Expected utility per joint outcome of the query variables.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UtilityResult {
    pub variables: Vec<String>,
    /// Row-major over `variables`, last varying fastest.
    pub values: Vec<f64>,
}

impl UtilityResult {
    /// The single value of a query-free solve.
    pub fn scalar(&self) -> Option<f64> {
        if self.variables.is_empty() {
            self.values.first().copied()
        } else {
            None
        }
    }
}

/// A compiled, solvable network.
#[derive(Debug, Clone)]
pub struct Network {
    definition: NetworkDef,
    config: SolverConfig,
    registry: Registry,
    /// Declaration order.
    variables: Vec<Variable>,
    lookup: FxHashMap<String, usize>,
    parents: Vec<Vec<usize>>,
    order: Vec<usize>,
    factors: Vec<Factor>,
    dependencies: DependencyMap,
    utility_weights: FxHashMap<VariableId, f64>,
    policies: Vec<DecisionPolicy>,
}

impl Network {
    /// Compiles `definition` with the default [`SolverConfig`].
    pub fn new(definition: NetworkDef) -> Result<Self, InferenceError> {
        Self::with_config(definition, SolverConfig::default())
    }

    /// Compiles `definition`.
    ///
    /// Every reference is checked here; a network that compiles only fails
    /// later on bad queries or models with no solution.
    pub fn with_config(
        mut definition: NetworkDef,
        config: SolverConfig,
    ) -> Result<Self, InferenceError> {
        let config = config.validate()?;
        let mut registry = Registry::new();
        let mut lookup = FxHashMap::default();
        let mut variables = Vec::with_capacity(definition.variables.len());

        for def in &mut definition.variables {
            let kind: NodeKind = def.kind.parse()?;
            if lookup.contains_key(&def.name) {
                return Err(InferenceError::DuplicateVariable(def.name.clone()));
            }
            if kind == NodeKind::Utility {
                match def.outcomes.len() {
                    0 => def.outcomes.push(UTILITY_OUTCOME.to_string()),
                    1 => {}
                    n => {
                        return Err(InferenceError::ValidationError(format!(
                            "utility '{}' must have a single outcome, got {}",
                            def.name, n
                        )))
                    }
                }
            }
            if def.outcomes.is_empty() {
                return Err(InferenceError::ValidationError(format!(
                    "variable '{}' has no outcomes",
                    def.name
                )));
            }
            for (i, outcome) in def.outcomes.iter().enumerate() {
                if def.outcomes[..i].contains(outcome) {
                    return Err(InferenceError::ValidationError(format!(
                        "outcome '{}' listed twice for '{}'",
                        outcome, def.name
                    )));
                }
            }
            let variable = registry.add_variable(kind, def.outcomes.len())?;
            lookup.insert(def.name.clone(), variables.len());
            variables.push(variable);
        }

        let n = variables.len();
        let mut table_of: Vec<Option<usize>> = vec![None; n];
        let mut parents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (f, fdef) in definition.factors.iter().enumerate() {
            let target = position(&lookup, &fdef.target)?;
            if table_of[target].is_some() {
                return Err(InferenceError::ValidationError(format!(
                    "more than one table for '{}'",
                    fdef.target
                )));
            }
            table_of[target] = Some(f);

            let mut given = Vec::with_capacity(fdef.given.len());
            for name in &fdef.given {
                let parent = position(&lookup, name)?;
                if given.contains(&parent) {
                    return Err(InferenceError::ValidationError(format!(
                        "'{}' lists parent '{}' twice",
                        fdef.target, name
                    )));
                }
                if variables[parent].declared_kind() == NodeKind::Utility {
                    return Err(InferenceError::ValidationError(format!(
                        "utility '{}' cannot be a parent of '{}'",
                        name, fdef.target
                    )));
                }
                given.push(parent);
            }

            match (variables[target].declared_kind(), &fdef.table) {
                (NodeKind::Decision, Some(_)) => {
                    return Err(InferenceError::ValidationError(format!(
                        "decision '{}' cannot have a table",
                        fdef.target
                    )))
                }
                (NodeKind::Chance | NodeKind::Utility, None) => {
                    return Err(InferenceError::ValidationError(format!(
                        "'{}' is missing its table",
                        fdef.target
                    )))
                }
                _ => {}
            }
            parents[target] = given;
        }

        for (i, variable) in variables.iter().enumerate() {
            if table_of[i].is_none() && variable.declared_kind() != NodeKind::Decision {
                return Err(InferenceError::ValidationError(format!(
                    "no table for '{}'",
                    definition.variables[i].name
                )));
            }
        }

        let order = topology::topological_order(&parents)?;

        let mut factors = Vec::with_capacity(definition.factors.len());
        let mut dependencies = DependencyMap::new();
        for &i in &order {
            let variable = variables[i];
            let mut axes: Vec<Variable> = parents[i].iter().map(|&p| variables[p]).collect();
            if variable.declared_kind() == NodeKind::Decision {
                dependencies.insert(variable, axes);
                continue;
            }
            let table = table_of[i]
                .and_then(|f| definition.factors[f].table.as_ref())
                .ok_or_else(|| {
                    InferenceError::Internal(format!(
                        "table for '{}' vanished after validation",
                        definition.variables[i].name
                    ))
                })?;
            if let Some(bad) = table.iter().find(|v| !v.is_finite()) {
                return Err(InferenceError::Numerical(format!(
                    "table for '{}' holds non-finite value {}",
                    definition.variables[i].name, bad
                )));
            }
            axes.push(variable);
            let factor = registry.create_factor(&axes, Some(table.clone()))?;
            let factor = if variable.declared_kind() == NodeKind::Chance
                && config.normalize_chance_tables
            {
                algebra::normalize_for(&mut registry, &factor, &variable)?
            } else {
                factor
            };
            factors.push(factor);
        }

        let mut utility_weights = FxHashMap::default();
        for (name, weight) in &config.utility_weights {
            let i = position(&lookup, name)?;
            if variables[i].declared_kind() != NodeKind::Utility {
                return Err(InferenceError::ValidationError(format!(
                    "weight given for '{}', which is not a utility",
                    name
                )));
            }
            utility_weights.insert(variables[i].id(), *weight);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "compiled network: {} variables, {} factors, {} decisions",
            variables.len(),
            factors.len(),
            dependencies.len()
        );

        Ok(Self {
            definition,
            config,
            registry,
            variables,
            lookup,
            parents,
            order,
            factors,
            dependencies,
            utility_weights,
            policies: Vec::new(),
        })
    }

    /// The definition this network was compiled from, with implicit utility
    /// outcomes filled in.
    pub fn definition(&self) -> &NetworkDef {
        &self.definition
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Compiled factors, in topological order of their targets.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// Variable names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.definition.variables.iter().map(|v| v.name.as_str())
    }

    /// Variable names ordered so each follows its parents.
    pub fn topological_order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.definition.variables[i].name.as_str())
            .collect()
    }

    /// Registry handle for `name`.
    pub fn variable(&self, name: &str) -> Result<Variable, InferenceError> {
        position(&self.lookup, name).map(|i| self.variables[i])
    }

    /// Declared kind of `name`.
    pub fn kind(&self, name: &str) -> Result<NodeKind, InferenceError> {
        self.variable(name).map(|v| v.declared_kind())
    }

    /// Parent names of `name`, outermost axis first.
    pub fn parents(&self, name: &str) -> Result<Vec<&str>, InferenceError> {
        let i = position(&self.lookup, name)?;
        Ok(self.parents[i]
            .iter()
            .map(|&p| self.definition.variables[p].name.as_str())
            .collect())
    }

    pub fn outcome_names(&self, name: &str) -> Result<&[String], InferenceError> {
        let i = position(&self.lookup, name)?;
        Ok(&self.definition.variables[i].outcomes)
    }

    pub fn outcome_index(&self, name: &str, outcome: &str) -> Result<usize, InferenceError> {
        self.outcome_names(name)?
            .iter()
            .position(|o| o == outcome)
            .ok_or_else(|| InferenceError::UnknownOutcome {
                variable: name.to_string(),
                outcome: outcome.to_string(),
            })
    }

    /// Resolved policies in decision order. Empty until solved.
    pub fn policies(&self) -> &[DecisionPolicy] {
        &self.policies
    }

    pub fn policy(&self, decision: &str) -> Option<&DecisionPolicy> {
        self.policies.iter().find(|p| p.name == decision)
    }

    /// Forgets resolved policies. The next solve resolves them again.
    pub fn clear_policies(&mut self) {
        self.policies.clear();
    }

    /// Swaps in a new table for `name` and recompiles.
    ///
    /// The table uses the same layout as the definition: parents outermost,
    /// `name` fastest. Resolved policies are cleared. On error the network
    /// is left unchanged.
    pub fn replace_table(&mut self, name: &str, table: Vec<f64>) -> Result<(), InferenceError> {
        let mut definition = self.definition.clone();
        let fdef = definition
            .factors
            .iter_mut()
            .find(|f| f.target == name)
            .ok_or_else(|| {
                if self.lookup.contains_key(name) {
                    InferenceError::ValidationError(format!("'{}' has no table", name))
                } else {
                    InferenceError::UnknownVariable(name.to_string())
                }
            })?;
        if fdef.table.is_none() {
            return Err(InferenceError::ValidationError(format!(
                "decision '{}' cannot have a table",
                name
            )));
        }
        fdef.table = Some(table);
        *self = Self::with_config(definition, self.config.clone())?;
        Ok(())
    }

    /// Resolves every decision by backward induction and stores the result.
    ///
    /// Previously stored policies are discarded first. Each table is laid
    /// out over the decision's declared parents followed by the decision; a
    /// parent the optimal rule ignores is broadcast. Decisions need not
    /// observe one another. A rule that does depend on a decision it does
    /// not observe is a [`InferenceError::ValidationError`].
    pub fn solve_policies(&mut self) -> Result<Vec<DecisionPolicy>, InferenceError> {
        self.policies.clear();
        if self.dependencies.is_empty() {
            return Ok(Vec::new());
        }

        let (mut registry, factors) = self.working_set()?;
        let resolved = {
            let mut eliminator = self.eliminator(&mut registry, factors)?;
            eliminator.solve_policies()?
        };

        let mut policies = Vec::with_capacity(resolved.len());
        for decision in &resolved {
            let i = self.index_of(&decision.decision)?;
            let mut axes: Vec<Variable> =
                self.parents[i].iter().map(|&p| self.variables[p]).collect();
            axes.push(decision.decision);
            let name = &self.definition.variables[i].name;
            let table = self.conform(&mut registry, &decision.policy, &axes, name)?;
            let expected = self.conform(&mut registry, &decision.combined, &axes, name)?;
            policies.push(DecisionPolicy {
                name: name.clone(),
                given: self.parents[i]
                    .iter()
                    .map(|&p| self.definition.variables[p].name.clone())
                    .collect(),
                table: table.into_data(),
                expected_utility: expected.into_data(),
            });
        }
        self.registry.absorb_factor_ids(&registry);

        #[cfg(feature = "tracing")]
        tracing::debug!("resolved {} decision policies", policies.len());

        self.policies = policies.clone();
        Ok(policies)
    }

    /// Posterior distribution of each query variable given `evidence`.
    ///
    /// Results follow query order; each vector follows declared outcome
    /// order. An observed query variable gets the one-hot vector of its
    /// observation.
    pub fn solve_query(
        &mut self,
        evidence: &[(&str, &str)],
        queries: &[&str],
    ) -> Result<Vec<(String, Vec<f64>)>, InferenceError> {
        self.ensure_policies()?;
        let evidence = self.evidence(evidence)?;
        let query = self.query(queries)?;
        let unobserved: Vec<Variable> = query
            .iter()
            .copied()
            .filter(|q| !evidence.iter().any(|e| e.variable == *q))
            .collect();
        let joint = self.run(&evidence, &unobserved, SolveTarget::Probability)?;

        let mut results = Vec::with_capacity(query.len());
        for (name, variable) in queries.iter().zip(&query) {
            let distribution = match evidence.iter().find(|e| e.variable == *variable) {
                Some(observed) => {
                    let mut one_hot = vec![0.0; variable.arity()];
                    one_hot[observed.outcome] = 1.0;
                    one_hot
                }
                None => {
                    let marginal = algebra::marginal(&mut self.registry, &joint, variable)?;
                    algebra::normalize(&mut self.registry, &marginal)?.into_data()
                }
            };
            results.push((name.to_string(), distribution));
        }
        Ok(results)
    }

    /// Expected utility for each joint outcome of `queries` given `evidence`.
    ///
    /// `utility` selects one utility term; `None` sums all of them with the
    /// configured weights. Query variables may not be observed.
    pub fn solve_utility(
        &mut self,
        evidence: &[(&str, &str)],
        queries: &[&str],
        utility: Option<&str>,
    ) -> Result<UtilityResult, InferenceError> {
        let value = self.utility_factor(evidence, queries, utility)?;
        let probability = self.joint(evidence, queries)?;
        let inverse = algebra::invert(&mut self.registry, &probability)?;
        let expected = algebra::product(&mut self.registry, &[&value, &inverse])?;
        let axes: Vec<Variable> = queries
            .iter()
            .map(|q| self.variable(q))
            .collect::<Result<_, _>>()?;
        let expected = algebra::rearrange(&mut self.registry, &expected, &axes)?;
        Ok(UtilityResult {
            variables: queries.iter().map(|q| q.to_string()).collect(),
            values: expected.into_data(),
        })
    }

    /// Expected total utility given `evidence`.
    pub fn expected_utility(&mut self, evidence: &[(&str, &str)]) -> Result<f64, InferenceError> {
        self.solve_utility(evidence, &[], None)?
            .scalar()
            .ok_or_else(|| InferenceError::Internal("query-free utility is not a scalar".into()))
    }

    /// Unnormalized joint probability of `queries` and `evidence`, axes in
    /// query order. Query variables may not be observed.
    pub fn joint(
        &mut self,
        evidence: &[(&str, &str)],
        queries: &[&str],
    ) -> Result<Factor, InferenceError> {
        self.ensure_policies()?;
        let evidence = self.evidence(evidence)?;
        let query = self.unobserved_query(&evidence, queries)?;
        let factor = self.run(&evidence, &query, SolveTarget::Probability)?;
        self.project(&factor, &query)
    }

    /// Probability-weighted utility over `queries`, axes in query order.
    ///
    /// Dividing by [`Network::joint`] of the same arguments gives the
    /// conditional expectation.
    pub fn utility_factor(
        &mut self,
        evidence: &[(&str, &str)],
        queries: &[&str],
        utility: Option<&str>,
    ) -> Result<Factor, InferenceError> {
        let target = match utility {
            Some(name) => {
                let variable = self.variable(name)?;
                if variable.declared_kind() != NodeKind::Utility {
                    return Err(InferenceError::ValidationError(format!(
                        "'{}' is not a utility",
                        name
                    )));
                }
                SolveTarget::UtilityTerm(variable)
            }
            None => {
                if !self
                    .variables
                    .iter()
                    .any(|v| v.declared_kind() == NodeKind::Utility)
                {
                    return Err(InferenceError::ValidationError(
                        "network has no utility nodes".into(),
                    ));
                }
                SolveTarget::TotalUtility
            }
        };
        self.ensure_policies()?;
        let evidence = self.evidence(evidence)?;
        let query = self.unobserved_query(&evidence, queries)?;
        let factor = self.run(&evidence, &query, target)?;
        self.project(&factor, &query)
    }

    fn ensure_policies(&mut self) -> Result<(), InferenceError> {
        if !self.dependencies.is_empty() && self.policies.is_empty() {
            self.solve_policies()?;
        }
        Ok(())
    }

    fn index_of(&self, variable: &Variable) -> Result<usize, InferenceError> {
        self.variables
            .iter()
            .position(|v| v == variable)
            .ok_or_else(|| InferenceError::Internal(format!("{} is not in this network", variable)))
    }

    fn evidence(&self, observations: &[(&str, &str)]) -> Result<Vec<Evidence>, InferenceError> {
        let mut evidence: Vec<Evidence> = Vec::with_capacity(observations.len());
        for &(name, outcome) in observations {
            let variable = self.variable(name)?;
            if variable.declared_kind() == NodeKind::Utility {
                return Err(InferenceError::ValidationError(format!(
                    "utility '{}' cannot be observed",
                    name
                )));
            }
            let outcome = self.outcome_index(name, outcome)?;
            match evidence.iter().find(|e| e.variable == variable) {
                Some(previous) if previous.outcome != outcome => {
                    return Err(InferenceError::ValidationError(format!(
                        "conflicting evidence for '{}'",
                        name
                    )))
                }
                Some(_) => {}
                None => evidence.push(Evidence::new(variable, outcome)),
            }
        }
        Ok(evidence)
    }

    fn query(&self, names: &[&str]) -> Result<Vec<Variable>, InferenceError> {
        let mut query = Vec::with_capacity(names.len());
        for &name in names {
            let variable = self.variable(name)?;
            if variable.declared_kind() == NodeKind::Utility {
                return Err(InferenceError::ValidationError(format!(
                    "utility '{}' cannot be queried for a distribution",
                    name
                )));
            }
            if query.contains(&variable) {
                return Err(InferenceError::ValidationError(format!(
                    "'{}' queried twice",
                    name
                )));
            }
            query.push(variable);
        }
        Ok(query)
    }

    fn unobserved_query(
        &self,
        evidence: &[Evidence],
        names: &[&str],
    ) -> Result<Vec<Variable>, InferenceError> {
        let query = self.query(names)?;
        for (name, variable) in names.iter().zip(&query) {
            if evidence.iter().any(|e| e.variable == *variable) {
                return Err(InferenceError::ValidationError(format!(
                    "'{}' is both observed and queried",
                    name
                )));
            }
        }
        Ok(query)
    }

    /// Registry copy and factor list for one solve, with stored policies
    /// injected as chance tables.
    fn working_set(&self) -> Result<(Registry, Vec<Factor>), InferenceError> {
        let mut registry = self.registry.clone();
        let mut factors = self.factors.clone();
        for policy in &self.policies {
            let decision = self.variable(&policy.name)?;
            registry.relabel_as_chance(&decision)?;
            let mut axes: Vec<Variable> = policy
                .given
                .iter()
                .map(|name| self.variable(name))
                .collect::<Result<_, _>>()?;
            axes.push(decision);
            factors.push(registry.create_factor(&axes, Some(policy.table.clone()))?);
        }
        Ok((registry, factors))
    }

    fn eliminator<'r>(
        &self,
        registry: &'r mut Registry,
        factors: Vec<Factor>,
    ) -> Result<Eliminator<'r>, InferenceError> {
        Ok(Eliminator::new(registry, factors, self.dependencies.clone())?
            .with_heuristic(self.config.heuristic)
            .with_utility_weights(self.utility_weights.clone()))
    }

    fn run(
        &mut self,
        evidence: &[Evidence],
        query: &[Variable],
        target: SolveTarget,
    ) -> Result<Factor, InferenceError> {
        let (mut registry, factors) = self.working_set()?;
        let result = {
            let mut eliminator = self.eliminator(&mut registry, factors)?;
            eliminator.solve(evidence, query, target)?
        };
        self.registry.absorb_factor_ids(&registry);
        Ok(result)
    }

    /// Sums out every axis of `factor` outside `axes` and orders the rest
    /// like `axes`.
    fn project(&mut self, factor: &Factor, axes: &[Variable]) -> Result<Factor, InferenceError> {
        let mut projected = factor.clone();
        for variable in factor.variables() {
            if !axes.contains(variable) {
                projected = algebra::sum_out(&mut self.registry, &projected, variable)?;
            }
        }
        if let Some(missing) = axes.iter().find(|v| !projected.contains(v)) {
            return Err(InferenceError::Internal(format!(
                "solve result lost query axis {}",
                missing
            )));
        }
        algebra::rearrange(&mut self.registry, &projected, axes)
    }

    /// Lays `factor` out over exactly `axes`, broadcasting missing ones.
    fn conform(
        &self,
        registry: &mut Registry,
        factor: &Factor,
        axes: &[Variable],
        decision: &str,
    ) -> Result<Factor, InferenceError> {
        if let Some(extra) = factor.variables().iter().find(|v| !axes.contains(v)) {
            let name = self
                .index_of(extra)
                .map(|i| self.definition.variables[i].name.as_str())
                .unwrap_or("?");
            return Err(InferenceError::ValidationError(format!(
                "policy for '{}' depends on '{}', which it does not observe",
                decision, name
            )));
        }
        let missing: Vec<Variable> = axes
            .iter()
            .copied()
            .filter(|v| !factor.contains(v))
            .collect();
        let widened = if missing.is_empty() {
            factor.clone()
        } else {
            let ones = registry.ones(&missing)?;
            algebra::product(registry, &[factor, &ones])?
        };
        algebra::rearrange(registry, &widened, axes)
    }
}

fn position(lookup: &FxHashMap<String, usize>, name: &str) -> Result<usize, InferenceError> {
    lookup
        .get(name)
        .copied()
        .ok_or_else(|| InferenceError::UnknownVariable(name.to_string()))
}
