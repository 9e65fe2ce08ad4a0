//! Fit state shared by every component that learns from data.

use crate::error::{OfferError, Result};

/// Whether a component has learned its parameters yet.
#[derive(Debug, Clone, Default)]
pub enum FitState<T> {
    #[default]
    Unfitted,
    Fitted(T),
}

impl<T> FitState<T> {
    pub fn is_fitted(&self) -> bool {
        matches!(self, FitState::Fitted(_))
    }

    /// Borrow the learned parameters, or fail with a `NotFitted` error
    /// naming `component`.
    pub fn get(&self, component: &'static str) -> Result<&T> {
        match self {
            FitState::Fitted(inner) => Ok(inner),
            FitState::Unfitted => Err(OfferError::NotFitted { component }),
        }
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            FitState::Fitted(inner) => Some(inner),
            FitState::Unfitted => None,
        }
    }
}
