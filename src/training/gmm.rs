use crate::config::GmmSweepConfig;
use crate::error::ModelError;
use crate::machine_learning::{CovarianceType, GaussianMixture};
use log::{debug, info};
use ndarray::{ArrayBase, Data, Ix2};
use serde::{Deserialize, Serialize};

/// BIC of one sweep candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BicScore {
    pub covariance_type: CovarianceType,
    pub n_components: usize,
    pub bic: f64,
}

/// Result of the mixture sweep.
///
/// # Fields
///
/// - `best` - The fitted mixture with the lowest BIC (the first one on ties)
/// - `bic_scores` - Every candidate's BIC in sweep order: covariance type outer, component count inner
/// - `lowest_bic` - BIC of `best`
#[derive(Debug, Clone)]
pub struct GmmSelection {
    pub best: GaussianMixture,
    pub bic_scores: Vec<BicScore>,
    pub lowest_bic: f64,
}

impl GmmSelection {
    /// BIC curve over component counts for one covariance type, in sweep order.
    pub fn scores_for(&self, covariance_type: CovarianceType) -> Vec<BicScore> {
        self.bic_scores
            .iter()
            .filter(|score| score.covariance_type == covariance_type)
            .copied()
            .collect()
    }

    /// Covariance type of the selected mixture.
    pub fn best_covariance_type(&self) -> CovarianceType {
        self.best.get_covariance_type()
    }

    /// Component count of the selected mixture.
    pub fn best_n_components(&self) -> usize {
        self.best.get_n_components()
    }
}

/// Selects a Gaussian mixture for `features` by BIC.
///
/// Every pair of covariance type and component count in `config` is fitted with
/// `config.n_init` EM runs seeded from `config.random_state`, then scored with BIC on
/// the same features. A candidate replaces the current best only if its BIC is strictly
/// lower, so the earliest candidate wins ties.
///
/// # Parameters
///
/// - `features` - Samples, shape (n_samples, n_features)
/// - `config` - Candidate grid and EM settings
///
/// # Returns
///
/// - `Ok(GmmSelection)` - The winner and every candidate's BIC
/// - `Err(ModelError::InputValidationError)` - Empty grid, invalid settings, or unusable features
///   (too few samples for a component count included)
/// - `Err(ModelError::ConvergenceError)` - A candidate's covariance became ill-defined
/// - `Err(ModelError::ProcessingError)` - No candidate reached a finite BIC
///
/// # Example
/// ```rust
/// use modelsmith::config::GmmSweepConfig;
/// use modelsmith::machine_learning::CovarianceType;
/// use modelsmith::training::train_gmm;
/// use ndarray::array;
///
/// let x = array![
///     [0.0, 0.1], [0.2, -0.1], [-0.1, 0.0], [0.1, 0.2], [0.05, 0.0],
///     [5.0, 5.1], [5.2, 4.9], [4.9, 5.0], [5.1, 5.2], [5.0, 4.95],
/// ];
/// let config = GmmSweepConfig {
///     covariance_types: vec![CovarianceType::Spherical, CovarianceType::Diag],
///     n_components: vec![1, 2],
///     n_init: 2,
///     ..GmmSweepConfig::default()
/// };
///
/// let selection = train_gmm(&x, &config).unwrap();
/// assert_eq!(selection.bic_scores.len(), 4);
/// assert_eq!(selection.best_n_components(), 2);
/// ```
pub fn train_gmm<S>(
    features: &ArrayBase<S, Ix2>,
    config: &GmmSweepConfig,
) -> Result<GmmSelection, ModelError>
where
    S: Data<Elem = f64> + Sync,
{
    config.validate()?;

    let mut bic_scores = Vec::with_capacity(config.n_candidates());
    let mut best: Option<(GaussianMixture, f64)> = None;

    for &covariance_type in &config.covariance_types {
        for &n_components in &config.n_components {
            let mut gmm = GaussianMixture::new(
                n_components,
                covariance_type,
                config.n_init,
                config.max_iter,
                config.tol,
                config.reg_covar,
                config.random_state,
            )?;
            gmm.fit(features)?;
            let bic = gmm.bic(features)?;

            debug!(
                "GMM candidate {} with {} components: BIC {:.4}",
                covariance_type, n_components, bic
            );
            bic_scores.push(BicScore {
                covariance_type,
                n_components,
                bic,
            });

            let lowest = best.as_ref().map_or(f64::INFINITY, |(_, lowest)| *lowest);
            if bic < lowest {
                best = Some((gmm, bic));
            }
        }
    }

    let (best, lowest_bic) = best.ok_or_else(|| {
        ModelError::ProcessingError("No mixture candidate reached a finite BIC".to_string())
    })?;

    let weights_shape = best.get_weights().map(|w| w.dim()).unwrap_or(0);
    info!(
        "GMM covariance type \"{}\", with ({},) dimensions",
        best.get_covariance_type(),
        weights_shape
    );

    Ok(GmmSelection {
        best,
        bic_scores,
        lowest_bic,
    })
}
