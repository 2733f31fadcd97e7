/// Gaussian mixture models fitted with expectation-maximization
pub mod gaussian_mixture;
/// This module provides helper functions for machine learning models
mod helper_function;
/// K-means clustering implementation for unsupervised learning
pub mod kmeans;

pub use gaussian_mixture::*;
pub use kmeans::*;
