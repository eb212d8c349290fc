//! Built-in modules.
//!
//! Small reference implementations of the module interface: a lag, a
//! scaler, a regression, an error metric and a drift generator. Each one has
//! a registry loader so persisted pipelines using it can be reloaded.

mod clock_shift;
mod concept_drift;
mod linear_regression;
mod rolling_rmse;
mod scaler;

pub use clock_shift::ClockShift;
pub use concept_drift::{Drift, DriftKind, SyntheticConceptDrift};
pub use linear_regression::LinearRegression;
pub use rolling_rmse::RollingRmse;
pub use scaler::StandardScaler;
