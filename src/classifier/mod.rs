use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("shape mismatch: expected {expected} values, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("classifier produced no classes")]
    NoClasses,
    #[error("classifier needs engineered features but none were supplied")]
    MissingFeatures,
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Scaled model inputs for one prediction.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    /// Window rows, oldest first.
    pub window: &'a [Vec<f64>],
    pub features: Option<&'a [f64]>,
}

/// Boundary to a trained model. Each returned vector is one output head's
/// class probabilities.
pub trait Classifier: Send {
    fn predict(&mut self, input: &ClassifierInput<'_>) -> Result<Vec<Vec<f64>>, ClassifierError>;
}

/// Index of the largest probability; the first one wins ties.
pub fn argmax(probabilities: &[f64]) -> Option<usize> {
    probabilities
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
            Some((_, q)) if q >= p => best,
            _ => Some((i, p)),
        })
        .map(|(i, _)| i)
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ClassifierError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ClassifierError::Read {
        path: display.clone(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ClassifierError::Parse {
        path: display,
        source,
    })
}

// STANDARD SCALER COMPONENT ---------------------------------------------------

/// Per-column `(x - mean) / scale`. A zero scale is treated as 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let scaler: Self = read_yaml(path.as_ref())?;
        if scaler.mean.len() != scaler.scale.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: scaler.mean.len(),
                got: scaler.scale.len(),
            });
        }
        Ok(scaler)
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if row.len() != self.mean.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.mean.len(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| if *s == 0.0 { x - m } else { (x - m) / s })
            .collect())
    }

    pub fn transform_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ClassifierError> {
        rows.iter().map(|row| self.transform(row)).collect()
    }
}

/// Applies `scaler` when one is configured, otherwise passes the row through.
pub fn scale_row(scaler: Option<&StandardScaler>, row: &[f64]) -> Result<Vec<f64>, ClassifierError> {
    match scaler {
        Some(scaler) => scaler.transform(row),
        None => Ok(row.to_vec()),
    }
}

// LINEAR CLASSIFIER COMPONENT -------------------------------------------------

/// Which part of the input a [`LinearClassifier`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearInput {
    /// The engineered feature vector.
    Features,
    /// Column means over the window.
    WindowMean,
    /// The newest window row.
    WindowLast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearHead {
    /// One row of weights per class.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl LinearHead {
    fn probabilities(&self, x: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if self.weights.is_empty() {
            return Err(ClassifierError::NoClasses);
        }
        if self.bias.len() != self.weights.len() {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.weights.len(),
                got: self.bias.len(),
            });
        }
        let mut logits = Vec::with_capacity(self.weights.len());
        for (row, b) in self.weights.iter().zip(&self.bias) {
            if row.len() != x.len() {
                return Err(ClassifierError::ShapeMismatch {
                    expected: row.len(),
                    got: x.len(),
                });
            }
            logits.push(row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b);
        }
        Ok(softmax(&logits))
    }
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Multinomial logistic model with one softmax head per output, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub input: LinearInput,
    pub heads: Vec<LinearHead>,
}

impl LinearClassifier {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let model: Self = read_yaml(path.as_ref())?;
        if model.heads.is_empty() {
            return Err(ClassifierError::NoClasses);
        }
        Ok(model)
    }

    fn input_vector(&self, input: &ClassifierInput<'_>) -> Result<Vec<f64>, ClassifierError> {
        match self.input {
            LinearInput::Features => input
                .features
                .map(<[f64]>::to_vec)
                .ok_or(ClassifierError::MissingFeatures),
            LinearInput::WindowLast => input
                .window
                .last()
                .cloned()
                .ok_or(ClassifierError::ShapeMismatch { expected: 1, got: 0 }),
            LinearInput::WindowMean => {
                let rows = input.window;
                let width = rows.first().map(Vec::len).ok_or(ClassifierError::ShapeMismatch {
                    expected: 1,
                    got: 0,
                })?;
                let mut sums = vec![0.0; width];
                for row in rows {
                    if row.len() != width {
                        return Err(ClassifierError::ShapeMismatch {
                            expected: width,
                            got: row.len(),
                        });
                    }
                    sums.iter_mut().zip(row).for_each(|(s, v)| *s += v);
                }
                let n = rows.len() as f64;
                Ok(sums.into_iter().map(|s| s / n).collect())
            }
        }
    }
}

impl Classifier for LinearClassifier {
    fn predict(&mut self, input: &ClassifierInput<'_>) -> Result<Vec<Vec<f64>>, ClassifierError> {
        let x = self.input_vector(input)?;
        self.heads.iter().map(|head| head.probabilities(&x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler {
            mean: vec![1.0, 10.0, 3.0],
            scale: vec![2.0, 5.0, 0.0],
        };
        assert_eq!(scaler.transform(&[3.0, 0.0, 4.0]).unwrap(), vec![1.0, -2.0, 1.0]);
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(ClassifierError::ShapeMismatch { expected: 3, got: 1 })
        ));
        assert_eq!(scale_row(None, &[4.0, 5.0]).unwrap(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_linear_classifier_picks_heaviest_class() {
        let mut model = LinearClassifier {
            input: LinearInput::Features,
            heads: vec![LinearHead {
                weights: vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]],
                bias: vec![0.0, 0.0, 0.0],
            }],
        };
        let features = [0.0, 4.0];
        let out = model
            .predict(&ClassifierInput {
                window: &[],
                features: Some(&features),
            })
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(argmax(&out[0]), Some(2));
    }

    #[test]
    fn test_linear_classifier_window_mean() {
        let mut model = LinearClassifier {
            input: LinearInput::WindowMean,
            heads: vec![
                LinearHead {
                    weights: vec![vec![1.0, 0.0], vec![-1.0, 0.0]],
                    bias: vec![0.0, 0.0],
                },
                LinearHead {
                    weights: vec![vec![0.0, -1.0], vec![0.0, 1.0]],
                    bias: vec![0.0, 0.0],
                },
            ],
        };
        let window = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let out = model
            .predict(&ClassifierInput {
                window: &window,
                features: None,
            })
            .unwrap();
        assert_eq!(argmax(&out[0]), Some(0));
        assert_eq!(argmax(&out[1]), Some(1));
    }

    #[test]
    fn test_missing_features_is_an_error() {
        let mut model = LinearClassifier {
            input: LinearInput::Features,
            heads: vec![LinearHead {
                weights: vec![vec![1.0]],
                bias: vec![0.0],
            }],
        };
        let result = model.predict(&ClassifierInput {
            window: &[],
            features: None,
        });
        assert!(matches!(result, Err(ClassifierError::MissingFeatures)));
    }

    #[test]
    fn test_load_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "input: window_last\nheads:\n  - weights: [[1.0, 0.0], [0.0, 1.0]]\n    bias: [0.0, 0.5]\n"
        )
        .unwrap();
        let model = LinearClassifier::load(file.path()).unwrap();
        assert_eq!(model.input, LinearInput::WindowLast);
        assert_eq!(model.heads[0].bias, vec![0.0, 0.5]);

        let missing = LinearClassifier::load("/nonexistent/model.yaml");
        assert!(matches!(missing, Err(ClassifierError::Read { .. })));
    }
}
