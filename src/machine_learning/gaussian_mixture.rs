use super::helper_function::{
    check_n_features, preliminary_check, validate_max_iterations, validate_tolerance,
};
use super::kmeans::KMeans;
use crate::error::ModelError;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayBase, ArrayView2, Axis, Data, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Covariance types, covariance estimation and Gaussian log-densities
pub mod covariance;

pub use covariance::*;

/// Weights, means and covariances of one mixture, plus the precision factors derived from them.
#[derive(Debug, Clone)]
struct MixtureParameters {
    weights: Array1<f64>,
    means: Array2<f64>,
    covariances: Covariances,
    precisions_cholesky: Covariances,
}

/// Outcome of one EM run.
#[derive(Debug, Clone)]
struct EmRun {
    parameters: MixtureParameters,
    lower_bound: f64,
    n_iter: usize,
    converged: bool,
}

/// Row-wise `ln Σ exp(a)`, stable for large magnitudes.
fn log_sum_exp_rows(a: &Array2<f64>) -> Array1<f64> {
    a.outer_iter()
        .map(|row| {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            if !max.is_finite() {
                return max;
            }
            max + row.mapv(|v| (v - max).exp()).sum().ln()
        })
        .collect()
}

/// Gaussian mixture model fitted with expectation-maximization.
///
/// Every EM run starts from the labelling of a k-means clustering seeded for that run.
/// The `n_init` runs are independent and executed in parallel; the run with the highest
/// final lower bound (mean log-likelihood) is kept, the earliest one on ties.
///
/// # Fields
///
/// - `n_components` - Number of mixture components
/// - `covariance_type` - Shape of the component covariances
/// - `n_init` - Number of EM runs
/// - `max_iter` - Maximum EM iterations per run
/// - `tol` - Convergence threshold on the change of the lower bound
/// - `reg_covar` - Non-negative value added to covariance diagonals
/// - `random_state` - Seed from which the per-run seeds are drawn
/// - `weights` / `means` / `covariances` / `precisions_cholesky` - Fitted parameters
/// - `converged` - Whether the kept run converged
/// - `n_iter` - EM iterations of the kept run
/// - `lower_bound` - Lower bound of the kept run
///
/// # Example
/// ```rust
/// use modelsmith::machine_learning::gaussian_mixture::{CovarianceType, GaussianMixture};
/// use ndarray::array;
///
/// let x = array![
///     [0.0, 0.1], [0.2, -0.1], [-0.1, 0.0], [0.1, 0.2],
///     [5.0, 5.1], [5.2, 4.9], [4.9, 5.0], [5.1, 5.2],
/// ];
///
/// let mut gmm = GaussianMixture::new(2, CovarianceType::Diag, 3, 100, 1e-3, 1e-6, Some(2)).unwrap();
/// gmm.fit(&x).unwrap();
///
/// let labels = gmm.predict(&x).unwrap();
/// assert_eq!(labels[0], labels[1]);
/// assert_ne!(labels[0], labels[4]);
/// assert!(gmm.bic(&x).unwrap().is_finite());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianMixture {
    n_components: usize,
    covariance_type: CovarianceType,
    n_init: usize,
    max_iter: usize,
    tol: f64,
    reg_covar: f64,
    random_state: Option<u64>,
    weights: Option<Array1<f64>>,
    means: Option<Array2<f64>>,
    covariances: Option<Covariances>,
    precisions_cholesky: Option<Covariances>,
    converged: bool,
    n_iter: Option<usize>,
    lower_bound: Option<f64>,
}

impl Default for GaussianMixture {
    /// # Default Values
    ///
    /// - `n_components` - 1
    /// - `covariance_type` - Full
    /// - `n_init` - 1
    /// - `max_iter` - 100
    /// - `tol` - 1e-3
    /// - `reg_covar` - 1e-6
    /// - `random_state` - None
    fn default() -> Self {
        GaussianMixture {
            n_components: 1,
            covariance_type: CovarianceType::Full,
            n_init: 1,
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
            random_state: None,
            weights: None,
            means: None,
            covariances: None,
            precisions_cholesky: None,
            converged: false,
            n_iter: None,
            lower_bound: None,
        }
    }
}

impl GaussianMixture {
    /// Creates an unfitted Gaussian mixture.
    ///
    /// # Parameters
    ///
    /// - `n_components` - Number of components (at least 1)
    /// - `covariance_type` - Shape of the component covariances
    /// - `n_init` - Number of EM runs (at least 1)
    /// - `max_iter` - Maximum EM iterations per run (at least 1)
    /// - `tol` - Convergence threshold, positive and finite
    /// - `reg_covar` - Diagonal regularization, non-negative and finite
    /// - `random_state` - Seed for reproducible fits
    ///
    /// # Returns
    ///
    /// - `Ok(Self)` - The model
    /// - `Err(ModelError::InputValidationError)` - A parameter is out of range
    pub fn new(
        n_components: usize,
        covariance_type: CovarianceType,
        n_init: usize,
        max_iter: usize,
        tol: f64,
        reg_covar: f64,
        random_state: Option<u64>,
    ) -> Result<Self, ModelError> {
        if n_components == 0 {
            return Err(ModelError::InputValidationError(
                "n_components must be greater than 0".to_string(),
            ));
        }
        if n_init == 0 {
            return Err(ModelError::InputValidationError(
                "n_init must be greater than 0".to_string(),
            ));
        }
        validate_max_iterations(max_iter)?;
        validate_tolerance(tol)?;
        if reg_covar < 0.0 || !reg_covar.is_finite() {
            return Err(ModelError::InputValidationError(format!(
                "reg_covar must be non-negative and finite, got {}",
                reg_covar
            )));
        }

        Ok(GaussianMixture {
            n_components,
            covariance_type,
            n_init,
            max_iter,
            tol,
            reg_covar,
            random_state,
            ..Default::default()
        })
    }

    // Getters
    get_field!(get_n_components, n_components, usize);
    get_field!(get_covariance_type, covariance_type, CovarianceType);
    get_field!(get_n_init, n_init, usize);
    get_field!(get_max_iterations, max_iter, usize);
    get_field!(get_tolerance, tol, f64);
    get_field!(get_reg_covar, reg_covar, f64);
    get_field!(get_random_state, random_state, Option<u64>);
    get_field_as_ref!(get_weights, weights, Option<&Array1<f64>>);
    get_field_as_ref!(get_means, means, Option<&Array2<f64>>);
    get_field_as_ref!(get_covariances, covariances, Option<&Covariances>);
    get_field_as_ref!(get_precisions_cholesky, precisions_cholesky, Option<&Covariances>);
    get_field!(get_converged, converged, bool);
    get_field!(get_n_iter, n_iter, Option<usize>);
    get_field!(get_lower_bound, lower_bound, Option<f64>);

    /// Estimates weights, means, covariances and precision factors from responsibilities.
    fn estimate_parameters(
        &self,
        x: &ArrayView2<f64>,
        resp: &ArrayView2<f64>,
    ) -> Result<MixtureParameters, ModelError> {
        let nk = resp.sum_axis(Axis(0)) + 10.0 * f64::EPSILON;
        let means = resp.t().dot(x) / &nk.view().insert_axis(Axis(1));
        let covariances = estimate_covariances(
            self.covariance_type,
            resp,
            x,
            &nk,
            &means,
            self.reg_covar,
        );
        let precisions_cholesky = compute_precision_cholesky(&covariances)?;
        let weights = &nk / nk.sum();

        Ok(MixtureParameters {
            weights,
            means,
            covariances,
            precisions_cholesky,
        })
    }

    /// Log-density of each sample under each weighted component, shape (n_samples, n_components).
    fn weighted_log_prob(x: &ArrayView2<f64>, parameters: &MixtureParameters) -> Array2<f64> {
        estimate_log_gaussian_prob(x, &parameters.means, &parameters.precisions_cholesky)
            + &parameters.weights.mapv(f64::ln)
    }

    /// E step: mean log-likelihood and log-responsibilities.
    fn e_step(x: &ArrayView2<f64>, parameters: &MixtureParameters) -> (f64, Array2<f64>) {
        let weighted = Self::weighted_log_prob(x, parameters);
        let log_prob_norm = log_sum_exp_rows(&weighted);
        let log_resp = weighted - &log_prob_norm.view().insert_axis(Axis(1));
        (log_prob_norm.mean().unwrap_or(f64::NEG_INFINITY), log_resp)
    }

    /// One-hot responsibilities from a k-means labelling seeded with `seed`.
    fn initial_responsibilities(
        &self,
        x: &ArrayView2<f64>,
        seed: u64,
    ) -> Result<Array2<f64>, ModelError> {
        let mut kmeans = KMeans::new(self.n_components, 300, 1e-4, Some(seed))?;
        let labels = kmeans.fit_predict(x)?;

        let mut resp = Array2::<f64>::zeros((x.nrows(), self.n_components));
        for (i, &label) in labels.iter().enumerate() {
            resp[[i, label]] = 1.0;
        }
        Ok(resp)
    }

    /// Runs EM from one k-means initialization until the lower bound settles or `max_iter` is hit.
    fn run_em(&self, x: &ArrayView2<f64>, seed: u64) -> Result<EmRun, ModelError> {
        let resp = self.initial_responsibilities(x, seed)?;
        let mut parameters = self.estimate_parameters(x, &resp.view())?;

        let mut lower_bound = f64::NEG_INFINITY;
        let mut converged = false;
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            n_iter = iter;
            let prev_lower_bound = lower_bound;

            let (log_prob_norm, log_resp) = Self::e_step(x, &parameters);
            parameters = self.estimate_parameters(x, &log_resp.mapv(f64::exp).view())?;
            lower_bound = log_prob_norm;

            if (lower_bound - prev_lower_bound).abs() < self.tol {
                converged = true;
                break;
            }
        }

        Ok(EmRun {
            parameters,
            lower_bound,
            n_iter,
            converged,
        })
    }

    /// Fits the mixture with `n_init` EM runs and keeps the best one.
    ///
    /// # Parameters
    ///
    /// - `x` - Samples, shape (n_samples, n_features)
    ///
    /// # Returns
    ///
    /// - `Ok(&mut Self)` - The fitted model for chaining
    /// - `Err(ModelError::InputValidationError)` - Empty or non-finite data, fewer than two samples,
    ///   or fewer samples than components
    /// - `Err(ModelError::ConvergenceError)` - A covariance became ill-defined
    pub fn fit<S>(&mut self, x: &ArrayBase<S, Ix2>) -> Result<&mut Self, ModelError>
    where
        S: Data<Elem = f64> + Sync,
    {
        preliminary_check(x)?;
        let x = x.view();
        let n_samples = x.nrows();

        if n_samples < 2 {
            return Err(ModelError::InputValidationError(format!(
                "Expected at least 2 samples, got {}",
                n_samples
            )));
        }
        if n_samples < self.n_components {
            return Err(ModelError::InputValidationError(format!(
                "Expected n_samples >= n_components but got n_components = {}, n_samples = {}",
                self.n_components, n_samples
            )));
        }

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let seeds: Vec<u64> = (0..self.n_init).map(|_| rng.random::<u64>()).collect();

        let runs: Vec<EmRun> = seeds
            .par_iter()
            .map(|&seed| self.run_em(&x, seed))
            .collect::<Result<Vec<_>, _>>()?;

        let best = runs
            .into_iter()
            .fold(None::<EmRun>, |best, run| match best {
                Some(b) if run.lower_bound > b.lower_bound => Some(run),
                None => Some(run),
                kept => kept,
            })
            .ok_or_else(|| ModelError::ProcessingError("No EM run was executed".to_string()))?;

        if !best.converged {
            warn!(
                "Best performing initialization of the {} mixture with {} components did not converge; \
                 try different init parameters, increase max_iter or tol, or check for degenerate data",
                self.covariance_type, self.n_components
            );
        }

        debug!(
            "GaussianMixture ({}, {} components) fitted: {} iterations, lower bound {:.6}",
            self.covariance_type, self.n_components, best.n_iter, best.lower_bound
        );

        self.weights = Some(best.parameters.weights);
        self.means = Some(best.parameters.means);
        self.covariances = Some(best.parameters.covariances);
        self.precisions_cholesky = Some(best.parameters.precisions_cholesky);
        self.converged = best.converged;
        self.n_iter = Some(best.n_iter);
        self.lower_bound = Some(best.lower_bound);

        Ok(self)
    }

    /// Fitted parameters, validated against the feature count of `x`.
    fn fitted_parameters<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<MixtureParameters, ModelError>
    where
        S: Data<Elem = f64>,
    {
        match (
            &self.weights,
            &self.means,
            &self.covariances,
            &self.precisions_cholesky,
        ) {
            (Some(weights), Some(means), Some(covariances), Some(precisions_cholesky)) => {
                preliminary_check(x)?;
                check_n_features(x, means.ncols())?;
                Ok(MixtureParameters {
                    weights: weights.clone(),
                    means: means.clone(),
                    covariances: covariances.clone(),
                    precisions_cholesky: precisions_cholesky.clone(),
                })
            }
            _ => Err(ModelError::NotFitted),
        }
    }

    /// Per-sample log-likelihood, shape (n_samples,).
    pub fn score_samples<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array1<f64>, ModelError>
    where
        S: Data<Elem = f64>,
    {
        let parameters = self.fitted_parameters(x)?;
        Ok(log_sum_exp_rows(&Self::weighted_log_prob(
            &x.view(),
            &parameters,
        )))
    }

    /// Mean per-sample log-likelihood.
    pub fn score<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<f64, ModelError>
    where
        S: Data<Elem = f64>,
    {
        self.score_samples(x)?
            .mean()
            .ok_or_else(|| ModelError::InputValidationError("Input data is empty".to_string()))
    }

    /// Posterior probability of each component for each sample; rows sum to 1.
    pub fn predict_proba<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array2<f64>, ModelError>
    where
        S: Data<Elem = f64>,
    {
        let parameters = self.fitted_parameters(x)?;
        let (_, log_resp) = Self::e_step(&x.view(), &parameters);
        Ok(log_resp.mapv(f64::exp))
    }

    /// Most probable component for each sample.
    pub fn predict<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array1<usize>, ModelError>
    where
        S: Data<Elem = f64>,
    {
        let parameters = self.fitted_parameters(x)?;
        let weighted = Self::weighted_log_prob(&x.view(), &parameters);
        Ok(weighted
            .outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
                        if v > best { (idx, v) } else { (best_idx, best) }
                    })
                    .0
            })
            .collect())
    }

    /// Number of free parameters: covariances, means and `n_components - 1` weights.
    pub fn n_parameters(&self) -> Result<usize, ModelError> {
        let n_features = self
            .means
            .as_ref()
            .map(|m| m.ncols())
            .ok_or(ModelError::NotFitted)?;
        let cov_params = self
            .covariance_type
            .n_covariance_parameters(self.n_components, n_features);
        let mean_params = self.n_components * n_features;
        Ok(cov_params + mean_params + self.n_components - 1)
    }

    /// Bayesian information criterion on `x`; lower is better.
    ///
    /// `bic = -2 · score(x) · n_samples + n_parameters · ln(n_samples)`
    pub fn bic<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<f64, ModelError>
    where
        S: Data<Elem = f64>,
    {
        let n_samples = x.nrows() as f64;
        Ok(-2.0 * self.score(x)? * n_samples + self.n_parameters()? as f64 * n_samples.ln())
    }

    /// Akaike information criterion on `x`; lower is better.
    ///
    /// `aic = -2 · score(x) · n_samples + 2 · n_parameters`
    pub fn aic<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<f64, ModelError>
    where
        S: Data<Elem = f64>,
    {
        let n_samples = x.nrows() as f64;
        Ok(-2.0 * self.score(x)? * n_samples + 2.0 * self.n_parameters()? as f64)
    }
}
