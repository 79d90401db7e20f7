use super::{FuzzyError, FuzzyInferenceEngine, FuzzyRule, FuzzyVariable, Universe};

/// Result of a fuzzy computation that may have fallen back to a deterministic value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Computed(T),
    Fallback { value: T, reason: FallbackReason },
}

impl<T: Copy> Outcome<T> {
    pub fn value(&self) -> T {
        match self {
            Outcome::Computed(value) => *value,
            Outcome::Fallback { value, .. } => *value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Outcome::Fallback { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// Fuzzy inference switched off in configuration.
    Disabled,
    Inference(FuzzyError),
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

// BLINK CONFIDENCE --------------------------------------------------------------

/// Confidence in [0, 1] for a smoothed blink strength in [0, 255].
#[derive(Debug, Clone)]
pub struct BlinkConfidenceSystem {
    engine: FuzzyInferenceEngine,
    enabled: bool,
}

impl BlinkConfidenceSystem {
    pub fn new() -> Result<Self, FuzzyError> {
        let strength = FuzzyVariable::new("strength", Universe::new(0.0, 255.0, 1.0)?)
            .term("weak", 0.0, 0.0, 69.0)?
            .term("ramp", 50.0, 70.0, 170.0)?
            .term("strong", 120.0, 170.0, 200.0)?;
        let confidence = FuzzyVariable::new("confidence", Universe::new(0.0, 1.0, 0.01)?)
            .term("low", 0.0, 0.0, 0.5)?
            .term("mid", 0.4, 0.7, 0.9)?
            .term("high", 0.7, 1.0, 1.0)?;
        let rules = [
            FuzzyRule::when("strength", "weak", ("confidence", "low")),
            FuzzyRule::when("strength", "ramp", ("confidence", "mid")),
            FuzzyRule::when("strength", "strong", ("confidence", "high")),
        ];

        Ok(Self {
            engine: FuzzyInferenceEngine::new(vec![strength], confidence, &rules)?,
            enabled: true,
        })
    }

    /// Same system with inference switched off; every call uses the linear fallback.
    pub fn disabled() -> Result<Self, FuzzyError> {
        let mut system = Self::new()?;
        system.enabled = false;
        Ok(system)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// 0.7 at strength 70 rising linearly to 1.0 at 170, clipped to [0, 1].
    pub fn linear_fallback(strength: f64) -> f64 {
        let value = 0.7 + 0.3 * ((strength - 70.0) / 100.0);
        round_to(value.clamp(0.0, 1.0), 2)
    }

    /// Rounded to two decimals. A non-finite strength is the only hard error.
    pub fn calculate(&self, strength: f64) -> Result<Outcome<f64>, FuzzyError> {
        if !strength.is_finite() {
            return Err(FuzzyError::NonFiniteInput {
                variable: "strength".to_string(),
                value: strength,
            });
        }
        if !self.enabled {
            return Ok(Outcome::Fallback {
                value: Self::linear_fallback(strength),
                reason: FallbackReason::Disabled,
            });
        }

        match self.engine.infer(&[("strength", strength)]) {
            Ok(value) if value.is_finite() => Ok(Outcome::Computed(round_to(value, 2))),
            Ok(value) => Ok(Outcome::Fallback {
                value: Self::linear_fallback(strength),
                reason: FallbackReason::Inference(FuzzyError::NonFiniteInput {
                    variable: "confidence".to_string(),
                    value,
                }),
            }),
            Err(e) => Ok(Outcome::Fallback {
                value: Self::linear_fallback(strength),
                reason: FallbackReason::Inference(e),
            }),
        }
    }
}

// MIND STATE EFFECT -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MindEffects {
    pub attention_effect: f64,
    pub meditation_effect: f64,
    pub net_effect: Outcome<f64>,
}

/// Two single-antecedent effect engines feeding a two-antecedent conflict resolver.
#[derive(Debug, Clone)]
pub struct MindStateSystem {
    attention: FuzzyInferenceEngine,
    meditation: FuzzyInferenceEngine,
    conflict: FuzzyInferenceEngine,
}

/// Net effect used when the resolver has no rule for the input pair.
pub const UNCOVERED_NET_EFFECT: f64 = 0.0;

impl MindStateSystem {
    pub fn new() -> Result<Self, FuzzyError> {
        Ok(Self {
            attention: Self::effect_engine(
                "attention",
                [("low", "neutral"), ("medium", "positive"), ("high", "positive")],
            )?,
            meditation: Self::effect_engine(
                "meditation",
                [("low", "positive"), ("medium", "neutral"), ("high", "negative")],
            )?,
            conflict: Self::conflict_engine()?,
        })
    }

    fn effect_engine(input: &str, table: [(&str, &str); 3]) -> Result<FuzzyInferenceEngine, FuzzyError> {
        let level = FuzzyVariable::new(input, Universe::new(0.0, 100.0, 1.0)?)
            .term("low", 0.0, 0.0, 34.0)?
            .term("medium", 30.0, 50.0, 67.0)?
            .term("high", 60.0, 100.0, 100.0)?;
        let effect = FuzzyVariable::new("effect", Universe::new(-1.0, 1.0, 0.01)?)
            .term("negative", -1.0, -1.0, 0.0)?
            .term("neutral", -0.3, 0.0, 0.3)?
            .term("positive", 0.0, 1.0, 1.0)?;
        let rules: Vec<FuzzyRule> = table
            .iter()
            .map(|(from, to)| FuzzyRule::when(input, from, ("effect", to)))
            .collect();
        FuzzyInferenceEngine::new(vec![level], effect, &rules)
    }

    fn conflict_engine() -> Result<FuzzyInferenceEngine, FuzzyError> {
        let mut inputs = Vec::with_capacity(2);
        for name in ["att_effect", "med_effect"] {
            inputs.push(
                FuzzyVariable::new(name, Universe::new(-1.0, 1.0, 0.01)?)
                    .term("neg", -1.0, -1.0, 0.0)?
                    .term("neutral", -0.5, 0.0, 0.5)?
                    .term("pos", 0.0, 1.0, 1.0)?,
            );
        }
        let net = FuzzyVariable::new("net_effect", Universe::new(-2.0, 2.0, 0.01)?)
            .term("strong_neg", -2.0, -2.0, -1.0)?
            .term("neg", -1.5, -1.0, -0.5)?
            .term("neutral", -0.7, 0.0, 0.7)?
            .term("pos", 0.5, 1.0, 1.5)?
            .term("strong_pos", 1.0, 2.0, 2.0)?;

        // (neutral, neutral) deliberately has no entry.
        let table = [
            ("pos", "neg", "strong_pos"),
            ("pos", "neutral", "pos"),
            ("neutral", "neg", "pos"),
            ("pos", "pos", "neutral"),
            ("neg", "neg", "neutral"),
            ("neg", "pos", "strong_neg"),
            ("neutral", "pos", "neg"),
            ("neg", "neutral", "neg"),
        ];
        let rules: Vec<FuzzyRule> = table
            .iter()
            .map(|(att, med, out)| {
                FuzzyRule::all(&[("att_effect", att), ("med_effect", med)], ("net_effect", out))
            })
            .collect();
        FuzzyInferenceEngine::new(inputs, net, &rules)
    }

    pub fn attention_effect(&self, attention: f64) -> Result<f64, FuzzyError> {
        Ok(round_to(self.attention.infer(&[("attention", attention)])?, 3))
    }

    pub fn meditation_effect(&self, meditation: f64) -> Result<f64, FuzzyError> {
        Ok(round_to(self.meditation.infer(&[("meditation", meditation)])?, 3))
    }

    /// Resolves the two effects. The uncovered (neutral, neutral) corner yields
    /// [`UNCOVERED_NET_EFFECT`] as a fallback; any other failure is returned.
    pub fn resolve(&self, att_effect: f64, med_effect: f64) -> Result<Outcome<f64>, FuzzyError> {
        match self
            .conflict
            .infer(&[("att_effect", att_effect), ("med_effect", med_effect)])
        {
            Ok(net) => Ok(Outcome::Computed(round_to(net, 3))),
            Err(e @ FuzzyError::EmptyAggregate(_)) => Ok(Outcome::Fallback {
                value: UNCOVERED_NET_EFFECT,
                reason: FallbackReason::Inference(e),
            }),
            Err(e) => Err(e),
        }
    }

    /// The rounded single-engine effects are what the resolver sees, so exact
    /// zeros stay exact.
    pub fn calculate_effects(&self, attention: f64, meditation: f64) -> Result<MindEffects, FuzzyError> {
        let attention_effect = self.attention_effect(attention)?;
        let meditation_effect = self.meditation_effect(meditation)?;
        let net_effect = self.resolve(attention_effect, meditation_effect)?;
        Ok(MindEffects {
            attention_effect,
            meditation_effect,
            net_effect,
        })
    }

    pub fn conflict_rule_count(&self) -> usize {
        self.conflict.rule_count()
    }
}
