//! Pipeline module - loading, cleaning, labelling and splitting tables

pub mod age;
pub mod distribution;
pub mod label;
pub mod loader;
pub mod preparation;
pub mod split;

pub use age::*;
pub use distribution::*;
pub use label::{
    binary_labels, count_label_classes, label_mask, split_features_and_label, unique_label_values,
};
pub use loader::*;
pub use preparation::*;
pub use split::*;
