//! Ordinary least squares regression over named feature series.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

use crate::core::TimeSeries;
use crate::errors::ModuleError;
use crate::module::{Module, ModuleDescriptor, ModuleInputs, Params, SharedModule};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Coefficients {
    features: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
}

/// Linear regression on any number of features and exactly one target.
///
/// Features are ordered by argument name. Rows where a feature or the target
/// is `NaN` are left out of the fit and predict `NaN`. `alpha > 0` adds an L2
/// penalty on the weights (not the intercept).
#[derive(Debug, Clone)]
pub struct LinearRegression {
    name: String,
    fit_intercept: bool,
    alpha: f64,
    coefficients: Option<Coefficients>,
}

impl LinearRegression {
    /// Registry tag.
    pub const TYPE_TAG: &'static str = "wattflow.linear_regression";

    /// Creates an unfitted regression with an intercept and no penalty.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fit_intercept: true,
            alpha: 0.0,
            coefficients: None,
        }
    }

    /// Sets whether an intercept is fitted.
    #[must_use]
    pub const fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    /// Sets the L2 penalty.
    #[must_use]
    pub const fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Returns the fitted weights (in feature name order) and intercept.
    #[must_use]
    pub fn coefficients(&self) -> Option<(&[f64], f64)> {
        self.coefficients
            .as_ref()
            .map(|c| (c.weights.as_slice(), c.intercept))
    }

    /// Registry loader.
    pub fn load(
        descriptor: &ModuleDescriptor,
        _dir: &Path,
        _registry: &Registry,
    ) -> Result<SharedModule, ModuleError> {
        let mut module = Self::new(&descriptor.name);
        module.set_params(&descriptor.params)?;
        module.coefficients = descriptor.state_as()?;
        Ok(SharedModule::new(module))
    }
}

/// Collects features column-wise, checking every series has `len` points.
fn feature_columns<'a>(inputs: &'a ModuleInputs, len: usize) -> Result<Vec<&'a [f64]>, ModuleError> {
    inputs
        .iter()
        .map(|(name, series)| {
            if series.len() == len {
                Ok(series.values())
            } else {
                Err(ModuleError::computation(format!(
                    "feature '{name}' has {} points, expected {len}",
                    series.len()
                )))
            }
        })
        .collect()
}

/// Solves `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModuleError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(ModuleError::computation(
                "normal equations are singular; add rows or set alpha > 0",
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

impl Module for LinearRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> &str {
        Self::TYPE_TAG
    }

    fn get_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("fit_intercept".into(), json!(self.fit_intercept));
        params.insert("alpha".into(), json!(self.alpha));
        params
    }

    fn set_params(&mut self, params: &Params) -> Result<(), ModuleError> {
        if let Some(value) = params.get("fit_intercept") {
            self.fit_intercept = value
                .as_bool()
                .ok_or_else(|| ModuleError::invalid_parameter("fit_intercept", "expected a boolean"))?;
        }
        if let Some(value) = params.get("alpha") {
            let alpha = value
                .as_f64()
                .filter(|a| *a >= 0.0)
                .ok_or_else(|| ModuleError::invalid_parameter("alpha", "expected a non-negative number"))?;
            self.alpha = alpha;
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    fn fit(&mut self, inputs: &ModuleInputs, targets: &ModuleInputs) -> Result<(), ModuleError> {
        if targets.len() != 1 {
            return Err(ModuleError::computation(format!(
                "expected exactly one target, got {}",
                targets.len()
            )));
        }
        let (_, target) = targets
            .first()
            .ok_or_else(|| ModuleError::computation("no target"))?;
        let columns = feature_columns(inputs, target.len())?;
        let offset = usize::from(self.fit_intercept);
        let p = columns.len() + offset;

        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        let mut rows = 0_usize;
        let mut row = vec![0.0; p];
        for (i, y) in target.values().iter().enumerate() {
            if y.is_nan() || columns.iter().any(|c| c[i].is_nan()) {
                continue;
            }
            if self.fit_intercept {
                row[0] = 1.0;
            }
            for (j, column) in columns.iter().enumerate() {
                row[j + offset] = column[i];
            }
            for a in 0..p {
                xty[a] += row[a] * y;
                for b in 0..p {
                    xtx[a][b] += row[a] * row[b];
                }
            }
            rows += 1;
        }
        if rows == 0 {
            return Err(ModuleError::computation("no complete rows to fit on"));
        }
        for (j, diagonal) in xtx.iter_mut().enumerate().skip(offset) {
            diagonal[j] += self.alpha;
        }

        let solution = solve(xtx, xty)?;
        let (intercept, weights) = if self.fit_intercept {
            (solution[0], solution[1..].to_vec())
        } else {
            (0.0, solution)
        };
        self.coefficients = Some(Coefficients {
            features: inputs.names().map(str::to_string).collect(),
            weights,
            intercept,
        });
        Ok(())
    }

    fn transform(&mut self, inputs: &ModuleInputs) -> Result<TimeSeries, ModuleError> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| ModuleError::computation(format!("regression '{}' is not fitted", self.name)))?;
        if inputs.len() != coefficients.weights.len() {
            return Err(ModuleError::computation(format!(
                "expected {} features, got {}",
                coefficients.weights.len(),
                inputs.len()
            )));
        }
        let (_, first) = inputs
            .first()
            .ok_or_else(|| ModuleError::computation("no features"))?;
        let columns = feature_columns(inputs, first.len())?;
        let predictions = (0..first.len())
            .map(|i| {
                columns
                    .iter()
                    .zip(&coefficients.weights)
                    .fold(coefficients.intercept, |acc, (column, w)| w.mul_add(column[i], acc))
            })
            .collect();
        first
            .with_values(predictions)
            .map_err(|err| ModuleError::computation(err.to_string()))
    }

    fn save(&self, _dir: &Path) -> Result<ModuleDescriptor, ModuleError> {
        let descriptor = ModuleDescriptor::new(Self::TYPE_TAG, &self.name, self.get_params());
        Ok(match &self.coefficients {
            Some(coefficients) => descriptor.with_state(serde_json::to_value(coefficients)?),
            None => descriptor,
        })
    }
}
