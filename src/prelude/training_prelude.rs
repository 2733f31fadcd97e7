pub use crate::config::{FitConfig, GmmSweepConfig, MlpConfig, TrainingConfig};
pub use crate::training::{
    BicScore, GmmSelection, Task, checkpoint_path, create_model, train_gmm, train_mlp,
};
