use crate::fuzzy::{BlinkConfidenceSystem, MindStateSystem};
use crate::processing::debounce::{BlinkDebouncer, BlinkDecision, BlinkEvent};
use crate::processing::smoothing::BlinkClass;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

fn to_py_err<E: std::fmt::Display>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

#[pyclass]
pub struct PyBlinkConfidence {
    system: BlinkConfidenceSystem,
}

#[pymethods]
impl PyBlinkConfidence {
    #[new]
    pub fn new(enabled: bool) -> PyResult<Self> {
        let mut system = BlinkConfidenceSystem::new().map_err(to_py_err)?;
        system.set_enabled(enabled);
        Ok(PyBlinkConfidence { system })
    }

    /// Returns (confidence, used_fallback).
    pub fn calculate(&self, strength: f64) -> PyResult<(f64, bool)> {
        let outcome = self.system.calculate(strength).map_err(to_py_err)?;
        Ok((outcome.value(), outcome.is_fallback()))
    }
}

#[pyclass]
pub struct PyMindState {
    system: MindStateSystem,
}

#[pymethods]
impl PyMindState {
    #[new]
    pub fn new() -> PyResult<Self> {
        Ok(PyMindState {
            system: MindStateSystem::new().map_err(to_py_err)?,
        })
    }

    /// Returns (attention_effect, meditation_effect, net_effect, net_used_fallback).
    pub fn calculate_effects(&self, attention: f64, meditation: f64) -> PyResult<(f64, f64, f64, bool)> {
        let effects = self
            .system
            .calculate_effects(attention, meditation)
            .map_err(to_py_err)?;
        Ok((
            effects.attention_effect,
            effects.meditation_effect,
            effects.net_effect.value(),
            effects.net_effect.is_fallback(),
        ))
    }
}

#[pyclass]
pub struct PyBlinkDebouncer {
    debouncer: BlinkDebouncer,
}

fn decision_name(decision: Option<BlinkDecision>) -> Option<&'static str> {
    decision.map(|d| match d {
        BlinkDecision::Single(_) => "single",
        BlinkDecision::Double(..) => "double",
    })
}

#[pymethods]
impl PyBlinkDebouncer {
    #[new]
    pub fn new(interval: f64) -> Self {
        PyBlinkDebouncer {
            debouncer: BlinkDebouncer::new(interval),
        }
    }

    /// Timeout check; returns "single" when a pending blink expires.
    pub fn poll(&mut self, now: f64) -> Option<&'static str> {
        decision_name(self.debouncer.poll(now))
    }

    /// Feeds a blink classified as `label` (1 or 2); returns "single", "double" or None.
    pub fn on_event(
        &mut self,
        now: f64,
        strength: f64,
        label: usize,
        confidence: f64,
    ) -> PyResult<Option<&'static str>> {
        let label = BlinkClass::from_index(label)
            .filter(|l| l.is_blink())
            .ok_or_else(|| PyValueError::new_err("label must be 1 or 2"))?;
        let event = BlinkEvent::new(now, strength, label, label, confidence);
        Ok(decision_name(self.debouncer.on_event(event, now)))
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn neurofuzz_control(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBlinkConfidence>()?;
    m.add_class::<PyMindState>()?;
    m.add_class::<PyBlinkDebouncer>()?;
    Ok(())
}
