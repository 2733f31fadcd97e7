use crate::error::ModelError;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape of the covariance matrices of a Gaussian mixture.
///
/// # Variants
///
/// - `Spherical` - One variance per component, shared by all features
/// - `Tied` - A single full covariance matrix shared by all components
/// - `Diag` - One diagonal covariance matrix per component
/// - `Full` - One full covariance matrix per component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceType {
    Spherical,
    Tied,
    Diag,
    Full,
}

impl CovarianceType {
    /// Every covariance type, in model-selection sweep order.
    pub const ALL: [CovarianceType; 4] = [
        CovarianceType::Spherical,
        CovarianceType::Tied,
        CovarianceType::Diag,
        CovarianceType::Full,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CovarianceType::Spherical => "spherical",
            CovarianceType::Tied => "tied",
            CovarianceType::Diag => "diag",
            CovarianceType::Full => "full",
        }
    }

    /// Number of free covariance parameters for `n_components` components over `n_features` features.
    pub fn n_covariance_parameters(&self, n_components: usize, n_features: usize) -> usize {
        let triangle = n_features * (n_features + 1) / 2;
        match self {
            CovarianceType::Spherical => n_components,
            CovarianceType::Tied => triangle,
            CovarianceType::Diag => n_components * n_features,
            CovarianceType::Full => n_components * triangle,
        }
    }
}

impl std::fmt::Display for CovarianceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Covariance parameters of a fitted mixture, shaped by its [`CovarianceType`].
///
/// The same layout holds the Cholesky factors of the precision matrices.
///
/// # Variants
///
/// - `Spherical` - Shape (n_components,)
/// - `Tied` - Shape (n_features, n_features)
/// - `Diag` - Shape (n_components, n_features)
/// - `Full` - Shape (n_components, n_features, n_features)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Covariances {
    Spherical(Array1<f64>),
    Tied(Array2<f64>),
    Diag(Array2<f64>),
    Full(Array3<f64>),
}

impl Covariances {
    pub fn covariance_type(&self) -> CovarianceType {
        match self {
            Covariances::Spherical(_) => CovarianceType::Spherical,
            Covariances::Tied(_) => CovarianceType::Tied,
            Covariances::Diag(_) => CovarianceType::Diag,
            Covariances::Full(_) => CovarianceType::Full,
        }
    }

    /// Covariance matrix of one component, expanded to (n_features, n_features).
    pub fn component_matrix(&self, component: usize, n_features: usize) -> Array2<f64> {
        match self {
            Covariances::Spherical(v) => Array2::eye(n_features) * v[component],
            Covariances::Tied(c) => c.clone(),
            Covariances::Diag(d) => Array2::from_diag(&d.row(component)),
            Covariances::Full(c) => c.index_axis(Axis(0), component).to_owned(),
        }
    }
}

fn ill_defined() -> ModelError {
    ModelError::ConvergenceError(
        "Fitting the mixture model failed because some components have ill-defined empirical \
         covariance (for instance caused by singleton or collapsed samples). Try to decrease \
         the number of components, or increase reg_covar."
            .to_string(),
    )
}

/// Estimates the covariances from responsibilities (M step).
///
/// # Parameters
///
/// - `covariance_type` - Shape of the estimate
/// - `resp` - Responsibilities, shape (n_samples, n_components)
/// - `x` - Samples, shape (n_samples, n_features)
/// - `nk` - Responsibility mass per component
/// - `means` - Component means, shape (n_components, n_features)
/// - `reg_covar` - Non-negative value added to the diagonal
pub fn estimate_covariances(
    covariance_type: CovarianceType,
    resp: &ArrayView2<f64>,
    x: &ArrayView2<f64>,
    nk: &Array1<f64>,
    means: &Array2<f64>,
    reg_covar: f64,
) -> Covariances {
    let (n_components, n_features) = means.dim();
    match covariance_type {
        CovarianceType::Full => {
            let mut covariances = Array3::<f64>::zeros((n_components, n_features, n_features));
            for k in 0..n_components {
                let diff = x - &means.row(k);
                let weighted = &diff * &resp.column(k).insert_axis(Axis(1));
                let mut cov = weighted.t().dot(&diff) / nk[k];
                cov.diag_mut().mapv_inplace(|v| v + reg_covar);
                covariances.index_axis_mut(Axis(0), k).assign(&cov);
            }
            Covariances::Full(covariances)
        }
        CovarianceType::Tied => {
            let avg_x2 = x.t().dot(x);
            let weighted_means = means * &nk.view().insert_axis(Axis(1));
            let avg_means2 = weighted_means.t().dot(means);
            let mut cov = (avg_x2 - avg_means2) / nk.sum();
            cov.diag_mut().mapv_inplace(|v| v + reg_covar);
            Covariances::Tied(cov)
        }
        CovarianceType::Diag => Covariances::Diag(diag_estimate(resp, x, nk, means, reg_covar)),
        CovarianceType::Spherical => {
            let diag = diag_estimate(resp, x, nk, means, reg_covar);
            Covariances::Spherical(diag.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(0)))
        }
    }
}

fn diag_estimate(
    resp: &ArrayView2<f64>,
    x: &ArrayView2<f64>,
    nk: &Array1<f64>,
    means: &Array2<f64>,
    reg_covar: f64,
) -> Array2<f64> {
    let nk_col = nk.view().insert_axis(Axis(1));
    let avg_x2 = resp.t().dot(&x.mapv(|v| v * v)) / &nk_col;
    let avg_means2 = means.mapv(|v| v * v);
    let avg_x_means = means * &resp.t().dot(x) / &nk_col;
    avg_x2 - 2.0 * avg_x_means + avg_means2 + reg_covar
}

/// Cholesky factor of the precision of a symmetric positive-definite matrix.
///
/// With `cov = L·Lᵀ`, the factor is `inv(L)ᵀ`, an upper-triangular matrix `U`
/// such that `inv(cov) = U·Uᵀ`.
fn precision_cholesky_matrix(cov: &ArrayView2<f64>) -> Result<Array2<f64>, ModelError> {
    let n = cov.nrows();
    let cov_slice: Vec<f64> = cov.iter().copied().collect();
    let cov_mat = nalgebra::DMatrix::from_row_slice(n, n, &cov_slice);

    let l = cov_mat.cholesky().ok_or_else(ill_defined)?.unpack();
    let l_inv = l
        .solve_lower_triangular(&nalgebra::DMatrix::identity(n, n))
        .ok_or_else(ill_defined)?;

    // row (i, j) of the result is l_inv[(j, i)]
    Ok(Array2::from_shape_fn((n, n), |(i, j)| l_inv[(j, i)]))
}

/// Computes the Cholesky factors of the precision matrices.
///
/// # Returns
///
/// - `Ok(Covariances)` - Factors in the same layout as the covariances
/// - `Err(ModelError::ConvergenceError)` - A covariance is not positive definite
pub fn compute_precision_cholesky(covariances: &Covariances) -> Result<Covariances, ModelError> {
    match covariances {
        Covariances::Full(c) => {
            let mut factors = Array3::<f64>::zeros(c.raw_dim());
            for (k, cov) in c.outer_iter().enumerate() {
                factors
                    .index_axis_mut(Axis(0), k)
                    .assign(&precision_cholesky_matrix(&cov)?);
            }
            Ok(Covariances::Full(factors))
        }
        Covariances::Tied(c) => Ok(Covariances::Tied(precision_cholesky_matrix(&c.view())?)),
        Covariances::Diag(d) => {
            if d.iter().any(|&v| v <= 0.0) {
                return Err(ill_defined());
            }
            Ok(Covariances::Diag(d.mapv(|v| 1.0 / v.sqrt())))
        }
        Covariances::Spherical(s) => {
            if s.iter().any(|&v| v <= 0.0) {
                return Err(ill_defined());
            }
            Ok(Covariances::Spherical(s.mapv(|v| 1.0 / v.sqrt())))
        }
    }
}

/// Log-determinant of each component's precision Cholesky factor, shape (n_components,).
fn log_det_cholesky(precisions_chol: &Covariances, n_components: usize, n_features: usize) -> Array1<f64> {
    match precisions_chol {
        Covariances::Full(c) => c
            .outer_iter()
            .map(|m| m.diag().mapv(f64::ln).sum())
            .collect(),
        Covariances::Tied(c) => Array1::from_elem(n_components, c.diag().mapv(f64::ln).sum()),
        Covariances::Diag(d) => d.mapv(f64::ln).sum_axis(Axis(1)),
        Covariances::Spherical(s) => s.mapv(|v| n_features as f64 * v.ln()),
    }
}

/// Squared Mahalanobis distance of every row to `mean`, given a precision Cholesky factor.
fn mahalanobis_full(x: &ArrayView2<f64>, mean: &ArrayView1<f64>, prec_chol: &ArrayView2<f64>) -> Array1<f64> {
    let y = x.dot(prec_chol) - mean.dot(prec_chol);
    y.mapv(|v| v * v).sum_axis(Axis(1))
}

/// Log-density of every sample under every Gaussian component.
///
/// # Returns
///
/// * `Array2<f64>` - Shape (n_samples, n_components), without mixture weights
pub fn estimate_log_gaussian_prob(
    x: &ArrayView2<f64>,
    means: &Array2<f64>,
    precisions_chol: &Covariances,
) -> Array2<f64> {
    let (n_components, n_features) = means.dim();
    let n_samples = x.nrows();
    let log_det = log_det_cholesky(precisions_chol, n_components, n_features);

    let mut log_prob = Array2::<f64>::zeros((n_samples, n_components));
    for k in 0..n_components {
        let mean = means.row(k);
        let dist = match precisions_chol {
            Covariances::Full(c) => mahalanobis_full(x, &mean, &c.index_axis(Axis(0), k)),
            Covariances::Tied(c) => mahalanobis_full(x, &mean, &c.view()),
            Covariances::Diag(d) => {
                let prec = d.row(k).mapv(|v| v * v);
                ((x - &mean).mapv(|v| v * v) * &prec).sum_axis(Axis(1))
            }
            Covariances::Spherical(s) => {
                let prec = s[k] * s[k];
                (x - &mean).mapv(|v| v * v).sum_axis(Axis(1)) * prec
            }
        };
        log_prob.column_mut(k).assign(&dist);
    }

    let constant = n_features as f64 * (2.0 * PI).ln();
    log_prob.mapv_inplace(|v| -0.5 * (constant + v));
    log_prob + &log_det
}
