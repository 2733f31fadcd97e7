use super::helper_function::{
    check_n_features, preliminary_check, squared_euclidean_distance_row, validate_max_iterations,
    validate_tolerance,
};
use crate::error::ModelError;
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Threshold for parallelization in KMeans clustering.
/// Below it samples are assigned sequentially.
const KMEANS_PARALLEL_THRESHOLD: usize = 1000;

/// KMeans clustering algorithm implementation.
///
/// Partitions observations into `n_clusters` groups, each sample belonging to the
/// cluster with the nearest centroid. Centroids are seeded with k-means++ and refined
/// with Lloyd iterations. The Gaussian mixture uses the resulting labelling as the
/// starting responsibilities of each EM run.
///
/// # Fields
///
/// - `n_clusters` - Number of clusters to form
/// - `max_iter` - Maximum number of Lloyd iterations
/// - `tol` - Relative inertia change under which the run is declared converged
/// - `random_seed` - Optional seed for the k-means++ draws
/// - `centroids` - Computed cluster centers after fitting
/// - `labels` - Cluster labels for training data after fitting
/// - `inertia` - Sum of squared distances to the closest centroid after fitting
/// - `n_iter` - Number of iterations run after fitting
///
/// # Examples
/// ```rust
/// use modelsmith::machine_learning::kmeans::KMeans;
/// use ndarray::array;
///
/// let data = array![
///     [1.0, 1.0], [1.2, 0.8], [0.9, 1.1],
///     [8.0, 8.0], [8.2, 7.9], [7.8, 8.1],
/// ];
///
/// let mut kmeans = KMeans::new(2, 100, 1e-4, Some(42)).unwrap();
/// let labels = kmeans.fit_predict(&data).unwrap();
///
/// assert_eq!(labels[0], labels[1]);
/// assert_ne!(labels[0], labels[3]);
/// assert_eq!(kmeans.get_centroids().unwrap().dim(), (2, 2));
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KMeans {
    n_clusters: usize,
    max_iter: usize,
    tol: f64,
    random_seed: Option<u64>,
    centroids: Option<Array2<f64>>,
    labels: Option<Array1<usize>>,
    inertia: Option<f64>,
    n_iter: Option<usize>,
}

impl Default for KMeans {
    /// implement Default for KMeans
    ///
    /// # Default Values
    ///
    /// - `n_clusters` - 8
    /// - `max_iter` - 300
    /// - `tolerance` - 1e-4
    /// - `random_seed` - None
    fn default() -> Self {
        KMeans {
            n_clusters: 8,
            max_iter: 300,
            tol: 1e-4,
            random_seed: None,
            centroids: None,
            labels: None,
            inertia: None,
            n_iter: None,
        }
    }
}

impl KMeans {
    /// Creates a new KMeans instance with the specified parameters.
    ///
    /// # Parameters
    ///
    /// - `n_clusters` - Number of clusters to form (must be greater than 0)
    /// - `max_iterations` - Maximum number of iterations for the algorithm (must be greater than 0)
    /// - `tolerance` - Convergence tolerance on the relative change of inertia
    /// - `random_seed` - Optional seed for random number generation to ensure reproducibility
    ///
    /// # Returns
    ///
    /// - `Result<Self, ModelError>` - A new KMeans instance if parameters are valid
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If `n_clusters` or `max_iterations` is 0, or `tolerance` is non-positive/non-finite
    pub fn new(
        n_clusters: usize,
        max_iterations: usize,
        tolerance: f64,
        random_seed: Option<u64>,
    ) -> Result<Self, ModelError> {
        if n_clusters == 0 {
            return Err(ModelError::InputValidationError(
                "n_clusters must be greater than 0".to_string(),
            ));
        }

        validate_max_iterations(max_iterations)?;
        validate_tolerance(tolerance)?;

        Ok(KMeans {
            n_clusters,
            max_iter: max_iterations,
            tol: tolerance,
            random_seed,
            ..Default::default()
        })
    }

    // Getters
    get_field!(get_n_clusters, n_clusters, usize);
    get_field!(get_max_iterations, max_iter, usize);
    get_field!(get_tolerance, tol, f64);
    get_field!(get_random_seed, random_seed, Option<u64>);
    get_field!(get_actual_iterations, n_iter, Option<usize>);
    get_field_as_ref!(get_labels, labels, Option<&Array1<usize>>);
    get_field!(get_inertia, inertia, Option<f64>);
    get_field_as_ref!(get_centroids, centroids, Option<&Array2<f64>>);

    /// Index of the closest centroid and the squared distance to it.
    fn closest_centroid(sample: &ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
        let mut min_dist = f64::MAX;
        let mut min_idx = 0;

        for (i, centroid) in centroids.outer_iter().enumerate() {
            let dist = squared_euclidean_distance_row(sample, &centroid);
            if dist < min_dist {
                min_dist = dist;
                min_idx = i;
            }
        }

        (min_idx, min_dist)
    }

    /// Closest centroid for every row, in parallel for large inputs.
    fn assign<S>(data: &ArrayBase<S, Ix2>, centroids: &Array2<f64>) -> Vec<(usize, f64)>
    where
        S: Data<Elem = f64> + Sync,
    {
        if data.nrows() >= KMEANS_PARALLEL_THRESHOLD {
            data.outer_iter()
                .into_par_iter()
                .map(|sample| Self::closest_centroid(&sample, centroids))
                .collect()
        } else {
            data.outer_iter()
                .map(|sample| Self::closest_centroid(&sample, centroids))
                .collect()
        }
    }

    /// Chooses the initial centroids with k-means++.
    ///
    /// The first center is a uniformly drawn sample; each following center is drawn with
    /// probability proportional to its squared distance from the nearest chosen center.
    fn init_centroids<S>(&self, data: &ArrayBase<S, Ix2>, rng: &mut StdRng) -> Array2<f64>
    where
        S: Data<Elem = f64> + Sync,
    {
        let n_samples = data.nrows();
        let mut centroids = Array2::<f64>::zeros((self.n_clusters, data.ncols()));

        let first_center_idx = rng.random_range(0..n_samples);
        centroids.row_mut(0).assign(&data.row(first_center_idx));

        for k in 1..self.n_clusters {
            let chosen = centroids.slice(ndarray::s![..k, ..]);
            let distances: Vec<f64> = data
                .outer_iter()
                .into_par_iter()
                .map(|sample| {
                    chosen
                        .outer_iter()
                        .map(|centroid| squared_euclidean_distance_row(&sample, &centroid))
                        .fold(f64::MAX, f64::min)
                })
                .collect();

            let total_dist: f64 = distances.iter().sum();

            // every sample already sits on a center
            if total_dist == 0.0 {
                let random_idx = rng.random_range(0..n_samples);
                centroids.row_mut(k).assign(&data.row(random_idx));
                continue;
            }

            // roulette wheel selection
            let choice = rng.random::<f64>() * total_dist;
            let mut cumulative_dist = 0.0;
            let mut picked = n_samples - 1;
            for (i, &dist) in distances.iter().enumerate() {
                cumulative_dist += dist;
                if cumulative_dist >= choice {
                    picked = i;
                    break;
                }
            }
            centroids.row_mut(k).assign(&data.row(picked));
        }

        centroids
    }

    /// Fits the KMeans model to the training data.
    ///
    /// # Parameters
    ///
    /// - `data` - Training data as a 2D array where each row is a sample
    ///
    /// # Returns
    ///
    /// - `Result<&mut Self, ModelError>` - A mutable reference to self for method chaining
    ///
    /// # Errors
    ///
    /// - `ModelError::InputValidationError` - If the number of samples is less than `n_clusters` or data contains invalid values
    pub fn fit<S>(&mut self, data: &ArrayBase<S, Ix2>) -> Result<&mut Self, ModelError>
    where
        S: Data<Elem = f64> + Sync,
    {
        preliminary_check(data)?;

        let n_samples = data.nrows();
        let n_features = data.ncols();

        if n_samples < self.n_clusters {
            return Err(ModelError::InputValidationError(format!(
                "Number of samples ({}) is less than number of clusters ({})",
                n_samples, self.n_clusters
            )));
        }

        let mut rng = match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut centroids = self.init_centroids(data, &mut rng);
        let mut assignments = Self::assign(data, &centroids);
        let mut prev_inertia: Option<f64> = None;
        let mut iter_count = 0;

        for i in 0..self.max_iter {
            iter_count = i + 1;

            let inertia: f64 = assignments.iter().map(|&(_, dist)| dist).sum();
            if let Some(prev) = prev_inertia {
                if (prev - inertia).abs() < self.tol * prev.max(self.tol) {
                    break;
                }
            }
            prev_inertia = Some(inertia);

            let mut new_centroids = Array2::<f64>::zeros((self.n_clusters, n_features));
            let mut counts = vec![0usize; self.n_clusters];
            for (sample_idx, &(cluster_idx, _)) in assignments.iter().enumerate() {
                new_centroids
                    .row_mut(cluster_idx)
                    .add_assign(&data.row(sample_idx));
                counts[cluster_idx] += 1;
            }

            for (cluster_idx, mut row) in new_centroids.outer_iter_mut().enumerate() {
                if counts[cluster_idx] > 0 {
                    let count_f = counts[cluster_idx] as f64;
                    row.mapv_inplace(|x| x / count_f);
                }
            }

            // an empty cluster takes the sample farthest from its centroid
            for cluster_idx in 0..self.n_clusters {
                if counts[cluster_idx] > 0 {
                    continue;
                }
                let farthest = assignments
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.1.total_cmp(&b.1.1))
                    .map(|(idx, _)| idx);
                match farthest {
                    Some(idx) => new_centroids.row_mut(cluster_idx).assign(&data.row(idx)),
                    None => new_centroids
                        .row_mut(cluster_idx)
                        .assign(&centroids.row(cluster_idx)),
                }
            }

            centroids = new_centroids;
            assignments = Self::assign(data, &centroids);
        }

        let labels = Array1::from_iter(assignments.iter().map(|&(label, _)| label));
        let inertia = assignments.iter().map(|&(_, dist)| dist).sum::<f64>();

        debug!(
            "KMeans finished: {} samples, {} clusters, {} iterations, inertia {:.6}",
            n_samples, self.n_clusters, iter_count, inertia
        );

        self.centroids = Some(centroids);
        self.labels = Some(labels);
        self.inertia = Some(inertia);
        self.n_iter = Some(iter_count);

        Ok(self)
    }

    /// Predicts the closest cluster for each sample in the input data.
    ///
    /// # Parameters
    ///
    /// - `data` - New data points for which to predict cluster assignments
    ///
    /// # Returns
    ///
    /// - `Result<Array1<usize>, ModelError>` - An array of cluster indices for each input data point
    ///
    /// # Errors
    ///
    /// - `ModelError::NotFitted` - If the model has not been fitted yet
    /// - `ModelError::InputValidationError` - If input data is empty, contains invalid values, or has incorrect feature dimensions
    pub fn predict<S>(&self, data: &ArrayBase<S, Ix2>) -> Result<Array1<usize>, ModelError>
    where
        S: Data<Elem = f64> + Sync,
    {
        let centroids = self.centroids.as_ref().ok_or(ModelError::NotFitted)?;
        preliminary_check(data)?;
        check_n_features(data, centroids.ncols())?;

        Ok(Self::assign(data, centroids)
            .into_iter()
            .map(|(label, _)| label)
            .collect())
    }

    /// Fits the model and returns the training labels.
    pub fn fit_predict<S>(&mut self, data: &ArrayBase<S, Ix2>) -> Result<Array1<usize>, ModelError>
    where
        S: Data<Elem = f64> + Sync,
    {
        self.fit(data)?;
        self.labels.clone().ok_or(ModelError::NotFitted)
    }
}
