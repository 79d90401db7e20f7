pub mod engine;
pub mod systems;

pub use engine::FuzzyInferenceEngine;
pub use systems::{BlinkConfidenceSystem, FallbackReason, MindEffects, MindStateSystem, Outcome};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuzzyError {
    #[error("unknown fuzzy variable '{0}'")]
    UnknownVariable(String),
    #[error("variable '{variable}' has no term '{term}'")]
    UnknownTerm { variable: String, term: String },
    #[error("no crisp input supplied for '{0}'")]
    MissingInput(String),
    #[error("input for '{variable}' is not finite ({value})")]
    NonFiniteInput { variable: String, value: f64 },
    #[error("membership shape ({a}, {b}, {c}) must satisfy a <= b <= c")]
    InvalidShape { a: f64, b: f64, c: f64 },
    #[error("universe [{min}, {max}] at resolution {resolution} is invalid")]
    InvalidUniverse { min: f64, max: f64, resolution: f64 },
    #[error("rule {0} has no antecedent clauses")]
    EmptyRule(usize),
    #[error("no rule fired for '{0}', centroid is undefined")]
    EmptyAggregate(String),
}

// MEMBERSHIP FUNCTION ---------------------------------------------------------

/// Triangular fuzzy set: rises from 0 at `a` to 1 at `b`, falls back to 0 at `c`.
/// Degenerate shoulders (`a == b` or `b == c`) are allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembershipFunction {
    a: f64,
    b: f64,
    c: f64,
}

impl MembershipFunction {
    pub fn triangular(a: f64, b: f64, c: f64) -> Result<Self, FuzzyError> {
        let ordered = a <= b && b <= c;
        if !ordered || !a.is_finite() || !c.is_finite() {
            return Err(FuzzyError::InvalidShape { a, b, c });
        }
        Ok(Self { a, b, c })
    }

    pub fn points(&self) -> (f64, f64, f64) {
        (self.a, self.b, self.c)
    }

    pub fn degree(&self, x: f64) -> f64 {
        let (a, b, c) = (self.a, self.b, self.c);
        if x < a || x > c {
            return 0.0;
        }
        if x == b {
            return 1.0;
        }
        // a == b or b == c can only reach these branches off the flat side,
        // so the denominators below are never zero.
        if x < b {
            (x - a) / (b - a)
        } else {
            (c - x) / (c - b)
        }
    }
}

// UNIVERSE --------------------------------------------------------------------

/// Closed scalar domain sampled every `resolution` units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Universe {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
}

impl Universe {
    pub fn new(min: f64, max: f64, resolution: f64) -> Result<Self, FuzzyError> {
        let valid = min.is_finite() && max.is_finite() && min < max && resolution > 0.0;
        if !valid || resolution > max - min {
            return Err(FuzzyError::InvalidUniverse {
                min,
                max,
                resolution,
            });
        }
        Ok(Self {
            min,
            max,
            resolution,
        })
    }

    pub fn sample_count(&self) -> usize {
        ((self.max - self.min) / self.resolution).round() as usize + 1
    }

    pub fn points(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.sample_count()).map(move |i| self.min + i as f64 * self.resolution)
    }

    pub fn clip(&self, x: f64) -> f64 {
        x.clamp(self.min, self.max)
    }
}

// VARIABLE --------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FuzzyTerm {
    pub name: String,
    pub shape: MembershipFunction,
}

/// A named universe with overlapping linguistic terms.
#[derive(Debug, Clone)]
pub struct FuzzyVariable {
    pub name: String,
    pub universe: Universe,
    terms: Vec<FuzzyTerm>,
}

impl FuzzyVariable {
    pub fn new(name: &str, universe: Universe) -> Self {
        Self {
            name: name.to_string(),
            universe,
            terms: Vec::new(),
        }
    }

    /// Adds (or replaces) a triangular term.
    pub fn term(mut self, name: &str, a: f64, b: f64, c: f64) -> Result<Self, FuzzyError> {
        let shape = MembershipFunction::triangular(a, b, c)?;
        match self.terms.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.shape = shape,
            None => self.terms.push(FuzzyTerm {
                name: name.to_string(),
                shape,
            }),
        }
        Ok(self)
    }

    pub fn terms(&self) -> &[FuzzyTerm] {
        &self.terms
    }

    pub fn term_index(&self, term: &str) -> Result<usize, FuzzyError> {
        self.terms
            .iter()
            .position(|t| t.name == term)
            .ok_or_else(|| FuzzyError::UnknownTerm {
                variable: self.name.clone(),
                term: term.to_string(),
            })
    }

    /// Degree of every term at `x`, in term order.
    pub fn fuzzify(&self, x: f64) -> Vec<f64> {
        self.terms.iter().map(|t| t.shape.degree(x)).collect()
    }
}

// RULE ------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    /// Fuzzy AND, the minimum of clause degrees.
    And,
    /// Fuzzy OR, the maximum of clause degrees.
    Or,
}

impl Connective {
    pub fn combine(&self, degrees: impl Iterator<Item = f64>) -> f64 {
        match self {
            Connective::And => degrees.fold(1.0, f64::min),
            Connective::Or => degrees.fold(0.0, f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub variable: String,
    pub term: String,
}

impl Clause {
    pub fn new(variable: &str, term: &str) -> Self {
        Self {
            variable: variable.to_string(),
            term: term.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyRule {
    pub antecedents: Vec<Clause>,
    pub connective: Connective,
    pub consequent: Clause,
}

impl FuzzyRule {
    /// IF `variable` is `term` THEN `consequent`.
    pub fn when(variable: &str, term: &str, consequent: (&str, &str)) -> Self {
        Self {
            antecedents: vec![Clause::new(variable, term)],
            connective: Connective::And,
            consequent: Clause::new(consequent.0, consequent.1),
        }
    }

    /// IF all clauses hold THEN `consequent`.
    pub fn all(clauses: &[(&str, &str)], consequent: (&str, &str)) -> Self {
        Self::combined(clauses, Connective::And, consequent)
    }

    /// IF any clause holds THEN `consequent`.
    pub fn any(clauses: &[(&str, &str)], consequent: (&str, &str)) -> Self {
        Self::combined(clauses, Connective::Or, consequent)
    }

    fn combined(clauses: &[(&str, &str)], connective: Connective, consequent: (&str, &str)) -> Self {
        Self {
            antecedents: clauses.iter().map(|(v, t)| Clause::new(v, t)).collect(),
            connective,
            consequent: Clause::new(consequent.0, consequent.1),
        }
    }
}
