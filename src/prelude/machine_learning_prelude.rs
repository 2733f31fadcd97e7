pub use crate::machine_learning::gaussian_mixture::{CovarianceType, Covariances, GaussianMixture};
pub use crate::machine_learning::kmeans::KMeans;
