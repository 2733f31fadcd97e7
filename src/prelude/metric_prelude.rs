pub use crate::metric::{Metric, categorical_accuracy, mean_squared_error, r2_score};
