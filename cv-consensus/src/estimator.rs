/// A problem that can be solved robustly by the engines in this crate.
///
/// Implementations should be cheap to call repeatedly. The engines call [`Estimator::generate`]
/// once per minimal sample and [`Estimator::error`] once per datum per candidate.
pub trait Estimator {
    /// A single observation, such as one 2D-3D correspondence.
    type Datum: Clone;
    /// The kind of model being estimated, such as a camera pose.
    type Model: Clone;

    /// Number of data in a minimal sample.
    const SAMPLE_SIZE: usize;

    /// Computes every candidate model consistent with the minimal `sample`.
    ///
    /// `sample` always has exactly [`Estimator::SAMPLE_SIZE`] entries. `models` is a buffer the
    /// caller reuses between calls; implementations must clear it before pushing candidates.
    /// Leaving it empty means the sample was degenerate, which is not an error.
    fn generate(&self, sample: &[Self::Datum], models: &mut Vec<Self::Model>);

    /// Non-negative error of `datum` under `model`. This is compared directly against
    /// [`RansacParameters::error_thresh`](crate::RansacParameters::error_thresh).
    fn error(&self, datum: &Self::Datum, model: &Self::Model) -> f64;

    /// Computes the error of every datum into `residuals`, replacing its contents.
    fn residuals(&self, data: &[Self::Datum], model: &Self::Model, residuals: &mut Vec<f64>) {
        residuals.clear();
        residuals.extend(data.iter().map(|datum| self.error(datum, model)));
    }
}
