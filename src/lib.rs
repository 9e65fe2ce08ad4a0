//! offerlift: Offer Completion Modelling Library
//!
//! A library for cleaning customer/offer tables with learned imputation
//! statistics and training a tuned classifier that predicts whether an
//! offer will be completed.

pub mod cli;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod state;
pub mod utils;

pub use error::{OfferError, Result};
