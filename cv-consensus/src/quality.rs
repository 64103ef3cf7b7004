/// Turns the residuals of one candidate into a cost, where lower is better, and collects its inliers.
pub trait QualityMeasurement {
    /// Computes the cost of a candidate from its `residuals`.
    ///
    /// `inliers` is cleared and filled with the indices of the residuals deemed inliers.
    fn compute_cost(&mut self, residuals: &[f64], inliers: &mut Vec<usize>) -> f64;
}

/// Classic RANSAC scoring: the cost is the number of outliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InlierSupport {
    pub error_thresh: f64,
}

impl InlierSupport {
    pub fn new(error_thresh: f64) -> Self {
        Self { error_thresh }
    }
}

impl QualityMeasurement for InlierSupport {
    fn compute_cost(&mut self, residuals: &[f64], inliers: &mut Vec<usize>) -> f64 {
        collect_below(residuals, self.error_thresh, inliers);
        (residuals.len() - inliers.len()) as f64
    }
}

/// Truncated quadratic scoring (MSAC). Inliers contribute their residual and
/// outliers contribute the threshold, so among models with equal support the tighter one wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mle {
    pub error_thresh: f64,
}

impl Mle {
    pub fn new(error_thresh: f64) -> Self {
        Self { error_thresh }
    }
}

impl QualityMeasurement for Mle {
    fn compute_cost(&mut self, residuals: &[f64], inliers: &mut Vec<usize>) -> f64 {
        collect_below(residuals, self.error_thresh, inliers);
        residuals
            .iter()
            .map(|&residual| residual.min(self.error_thresh))
            .sum()
    }
}

/// Least median of squares. The cost is the median residual, and inliers are found with the
/// robust standard deviation estimate of Rousseeuw and Leroy.
#[derive(Debug, Clone, Default)]
pub struct Lmeds {
    sample_size: usize,
    sorted: Vec<f64>,
}

impl Lmeds {
    /// `sample_size` is the number of data in a minimal sample, used to correct the
    /// standard deviation estimate for small inputs.
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            sorted: Vec::new(),
        }
    }

    /// Residuals below this are inliers, given the median residual of `num_data` data.
    pub fn inlier_threshold(&self, median: f64, num_data: usize) -> f64 {
        let dof = num_data.saturating_sub(self.sample_size).max(1) as f64;
        let sigma = 1.4826 * (1.0 + 5.0 / dof) * median.sqrt();
        (2.5 * sigma).powi(2)
    }
}

impl QualityMeasurement for Lmeds {
    fn compute_cost(&mut self, residuals: &[f64], inliers: &mut Vec<usize>) -> f64 {
        inliers.clear();
        if residuals.is_empty() {
            return f64::INFINITY;
        }
        self.sorted.clear();
        self.sorted.extend_from_slice(residuals);
        let mid = self.sorted.len() / 2;
        let (_, &mut median, _) = self.sorted.select_nth_unstable_by(mid, f64::total_cmp);
        let threshold = self.inlier_threshold(median, residuals.len());
        collect_below(residuals, threshold, inliers);
        median
    }
}

fn collect_below(residuals: &[f64], threshold: f64, inliers: &mut Vec<usize>) {
    inliers.clear();
    inliers.extend(
        residuals
            .iter()
            .enumerate()
            .filter(|&(_, &residual)| residual < threshold)
            .map(|(ix, _)| ix),
    );
}
