use super::{FuzzyError, FuzzyRule, FuzzyVariable, Connective};
use std::collections::HashMap;

/// Rule with every clause resolved to (antecedent index, term index).
#[derive(Debug, Clone)]
struct CompiledRule {
    clauses: Vec<(usize, usize)>,
    connective: Connective,
    consequent_term: usize,
}

/// Mamdani-style engine: min/max rule evaluation, max aggregation across rules,
/// clipped consequent terms and centroid defuzzification over a sampled universe.
#[derive(Debug, Clone)]
pub struct FuzzyInferenceEngine {
    antecedents: Vec<FuzzyVariable>,
    consequent: FuzzyVariable,
    rules: Vec<CompiledRule>,
}

impl FuzzyInferenceEngine {
    /// Fails if any rule mentions a variable or term that is not registered.
    pub fn new(
        antecedents: Vec<FuzzyVariable>,
        consequent: FuzzyVariable,
        rules: &[FuzzyRule],
    ) -> Result<Self, FuzzyError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (idx, rule) in rules.iter().enumerate() {
            if rule.antecedents.is_empty() {
                return Err(FuzzyError::EmptyRule(idx));
            }
            let mut clauses = Vec::with_capacity(rule.antecedents.len());
            for clause in &rule.antecedents {
                let var_idx = antecedents
                    .iter()
                    .position(|v| v.name == clause.variable)
                    .ok_or_else(|| FuzzyError::UnknownVariable(clause.variable.clone()))?;
                let term_idx = antecedents[var_idx].term_index(&clause.term)?;
                clauses.push((var_idx, term_idx));
            }
            if rule.consequent.variable != consequent.name {
                return Err(FuzzyError::UnknownVariable(rule.consequent.variable.clone()));
            }
            compiled.push(CompiledRule {
                clauses,
                connective: rule.connective,
                consequent_term: consequent.term_index(&rule.consequent.term)?,
            });
        }

        Ok(Self {
            antecedents,
            consequent,
            rules: compiled,
        })
    }

    pub fn consequent_name(&self) -> &str {
        &self.consequent.name
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Crisp inputs keyed by antecedent name to crisp output keyed by consequent name.
    pub fn evaluate(&self, inputs: &HashMap<String, f64>) -> Result<HashMap<String, f64>, FuzzyError> {
        let pairs: Vec<(&str, f64)> = inputs.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        let output = self.infer(&pairs)?;
        let mut result = HashMap::with_capacity(1);
        result.insert(self.consequent.name.clone(), output);
        Ok(result)
    }

    /// Same as [`evaluate`](Self::evaluate) for callers holding borrowed names.
    pub fn infer(&self, inputs: &[(&str, f64)]) -> Result<f64, FuzzyError> {
        let strengths = self.term_activations(inputs)?;
        self.defuzzify(&strengths)
    }

    /// Aggregated firing strength per consequent term (max across rules).
    pub fn term_activations(&self, inputs: &[(&str, f64)]) -> Result<Vec<f64>, FuzzyError> {
        // Fuzzify each antecedent once; inputs are clipped to the variable's universe.
        let mut degrees = Vec::with_capacity(self.antecedents.len());
        for variable in &self.antecedents {
            let value = inputs
                .iter()
                .find(|(name, _)| *name == variable.name)
                .map(|(_, v)| *v)
                .ok_or_else(|| FuzzyError::MissingInput(variable.name.clone()))?;
            if !value.is_finite() {
                return Err(FuzzyError::NonFiniteInput {
                    variable: variable.name.clone(),
                    value,
                });
            }
            degrees.push(variable.fuzzify(variable.universe.clip(value)));
        }

        let mut activations: Vec<f64> = vec![0.0; self.consequent.terms().len()];
        for rule in &self.rules {
            let firing = rule
                .connective
                .combine(rule.clauses.iter().map(|&(v, t)| degrees[v][t]));
            let slot = &mut activations[rule.consequent_term];
            *slot = slot.max(firing);
        }
        Ok(activations)
    }

    fn defuzzify(&self, activations: &[f64]) -> Result<f64, FuzzyError> {
        let terms = self.consequent.terms();
        let mut weighted = 0.0;
        let mut total = 0.0;
        for x in self.consequent.universe.points() {
            let degree = terms
                .iter()
                .zip(activations)
                .map(|(term, &level)| term.shape.degree(x).min(level))
                .fold(0.0, f64::max);
            weighted += x * degree;
            total += degree;
        }

        if total <= 0.0 {
            return Err(FuzzyError::EmptyAggregate(self.consequent.name.clone()));
        }
        Ok(weighted / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::Universe;

    fn toy_engine() -> FuzzyInferenceEngine {
        let input = FuzzyVariable::new("x", Universe::new(0.0, 10.0, 1.0).unwrap())
            .term("low", 0.0, 0.0, 5.0)
            .unwrap()
            .term("high", 5.0, 10.0, 10.0)
            .unwrap();
        let output = FuzzyVariable::new("y", Universe::new(0.0, 1.0, 0.01).unwrap())
            .term("small", 0.0, 0.0, 0.5)
            .unwrap()
            .term("large", 0.5, 1.0, 1.0)
            .unwrap();
        FuzzyInferenceEngine::new(
            vec![input],
            output,
            &[
                FuzzyRule::when("x", "low", ("y", "small")),
                FuzzyRule::when("x", "high", ("y", "large")),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_rule_centroid_matches_triangle_centroid() {
        let engine = toy_engine();
        // Only "low" fires fully: centroid of (0, 0, 0.5) is 1/6.
        let y = engine.infer(&[("x", 0.0)]).unwrap();
        assert!((y - 1.0 / 6.0).abs() < 0.01, "got {}", y);
        let y = engine.infer(&[("x", 10.0)]).unwrap();
        assert!((y - 5.0 / 6.0).abs() < 0.01, "got {}", y);
    }

    #[test]
    fn test_evaluate_returns_consequent_keyed_map() {
        let engine = toy_engine();
        let mut inputs = HashMap::new();
        inputs.insert("x".to_string(), 0.0);
        let out = engine.evaluate(&inputs).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.contains_key("y"));
    }

    #[test]
    fn test_rule_order_does_not_change_result() {
        let a = toy_engine();
        let input = FuzzyVariable::new("x", Universe::new(0.0, 10.0, 1.0).unwrap())
            .term("low", 0.0, 0.0, 5.0)
            .unwrap()
            .term("high", 5.0, 10.0, 10.0)
            .unwrap();
        let output = FuzzyVariable::new("y", Universe::new(0.0, 1.0, 0.01).unwrap())
            .term("small", 0.0, 0.0, 0.5)
            .unwrap()
            .term("large", 0.5, 1.0, 1.0)
            .unwrap();
        let b = FuzzyInferenceEngine::new(
            vec![input],
            output,
            &[
                FuzzyRule::when("x", "high", ("y", "large")),
                FuzzyRule::when("x", "low", ("y", "small")),
            ],
        )
        .unwrap();
        for x in [0.0, 2.5, 4.0, 6.0, 9.0] {
            assert_eq!(a.infer(&[("x", x)]).unwrap(), b.infer(&[("x", x)]).unwrap());
        }
    }

    #[test]
    fn test_zero_aggregate_is_reported_not_guessed() {
        // Both terms are zero exactly at x = 5.
        let engine = toy_engine();
        assert_eq!(
            engine.infer(&[("x", 5.0)]),
            Err(FuzzyError::EmptyAggregate("y".to_string()))
        );
    }

    #[test]
    fn test_inputs_are_clipped_to_universe() {
        let engine = toy_engine();
        let edge = engine.infer(&[("x", 10.0)]).unwrap();
        let beyond = engine.infer(&[("x", 250.0)]).unwrap();
        assert_eq!(edge, beyond);
    }

    #[test]
    fn test_missing_and_non_finite_inputs() {
        let engine = toy_engine();
        assert_eq!(
            engine.infer(&[("z", 1.0)]),
            Err(FuzzyError::MissingInput("x".to_string()))
        );
        assert!(matches!(
            engine.infer(&[("x", f64::NAN)]),
            Err(FuzzyError::NonFiniteInput { .. })
        ));
    }

    #[test]
    fn test_unregistered_rule_terms_are_rejected() {
        let input = FuzzyVariable::new("x", Universe::new(0.0, 10.0, 1.0).unwrap())
            .term("low", 0.0, 0.0, 5.0)
            .unwrap();
        let output = FuzzyVariable::new("y", Universe::new(0.0, 1.0, 0.01).unwrap())
            .term("small", 0.0, 0.0, 0.5)
            .unwrap();

        let unknown_term = FuzzyInferenceEngine::new(
            vec![input.clone()],
            output.clone(),
            &[FuzzyRule::when("x", "medium", ("y", "small"))],
        );
        assert!(matches!(unknown_term, Err(FuzzyError::UnknownTerm { .. })));

        let unknown_var = FuzzyInferenceEngine::new(
            vec![input],
            output,
            &[FuzzyRule::when("w", "low", ("y", "small"))],
        );
        assert_eq!(
            unknown_var.err(),
            Some(FuzzyError::UnknownVariable("w".to_string()))
        );
    }

    #[test]
    fn test_or_rule_fires_on_strongest_clause() {
        let a = FuzzyVariable::new("a", Universe::new(0.0, 1.0, 0.1).unwrap())
            .term("on", 0.0, 1.0, 1.0)
            .unwrap();
        let b = FuzzyVariable::new("b", Universe::new(0.0, 1.0, 0.1).unwrap())
            .term("on", 0.0, 1.0, 1.0)
            .unwrap();
        let out = FuzzyVariable::new("out", Universe::new(0.0, 1.0, 0.01).unwrap())
            .term("yes", 0.0, 1.0, 1.0)
            .unwrap();
        let engine = FuzzyInferenceEngine::new(
            vec![a, b],
            out,
            &[FuzzyRule::any(&[("a", "on"), ("b", "on")], ("out", "yes"))],
        )
        .unwrap();
        let levels = engine.term_activations(&[("a", 0.2), ("b", 0.7)]).unwrap();
        assert!((levels[0] - 0.7).abs() < 1e-12);
    }
}
