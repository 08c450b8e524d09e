//! Loaders for externally trained models.

pub mod catboost;
