use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid request: {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Projection horizon must cover at least one year, got {0}")]
    InvalidHorizon(u32),

    #[error("Non-finite {quantity} in year {year}")]
    NonFinite { year: u32, quantity: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("Expected {expected} yearly rows, got {actual}")]
    RowCount { expected: usize, actual: usize },

    #[error("Series {series} has {actual} entries, expected {expected}")]
    SeriesLength {
        series: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Year {year}: category expenses sum to {category_sum}, total is {total}")]
    CategorySum {
        year: usize,
        category_sum: f64,
        total: f64,
    },

    #[error("Year {year}: net worth {net_worth} differs from assets {assets} minus liabilities {liabilities}")]
    NetWorthIdentity {
        year: usize,
        net_worth: f64,
        assets: f64,
        liabilities: f64,
    },

    #[error("Year {year}: savings reserve is negative ({value})")]
    NegativeReserve { year: usize, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),
}

impl ProjectionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionError::Validation(_) => "ValidationError",
            ProjectionError::Simulation(_) => "SimulationError",
            ProjectionError::Consistency(_) => "ConsistencyError",
        }
    }
}

/// A milestone whose effect was skipped. Collected, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneWarning {
    pub milestone_index: usize,
    pub milestone_type: String,
    pub year: u32,
    pub reason: String,
}
