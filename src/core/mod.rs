mod amortize;
mod assemble;
mod engine;
mod error;
mod milestones;
mod normalize;
mod solver;
mod tax;
mod types;

pub use amortize::{DebtService, Loan, amortize, fixed_payment};
pub use engine::{simulate, simulate_with_policy};
pub use error::{
    ConsistencyError, MilestoneWarning, ProjectionError, SimulationError, ValidationError,
};
pub use normalize::{MAX_YEARS_TO_PROJECT, RawProjectionRequest, normalize, validate};
pub use solver::{RateSolveResult, solve_implied_rate};
pub use tax::{BracketSchedule, TablePolicy, TaxAssessment, TaxPolicy};
pub use types::{
    Asset, AssetType, Expenditure, ExpenseCategory, IncomeStream, IncomeType, Liability,
    LiabilityType, Milestone, MilestoneKind, PathType, ProjectionRequest, ProjectionResult,
    WorkStatus,
};
