use serde::{Deserialize, Serialize};

use super::error::MilestoneWarning;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    #[default]
    Baseline,
    Education,
    Career,
    Personal,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Salary,
    #[serde(alias = "partTime", alias = "part-time")]
    PartTime,
    Spouse,
    Business,
    Investment,
    Other,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpenseCategory {
    Housing,
    Transportation,
    Food,
    Healthcare,
    #[serde(alias = "personal_insurance")]
    PersonalInsurance,
    Apparel,
    Services,
    Entertainment,
    Other,
    Education,
    Childcare,
    Debt,
    Discretionary,
}

impl ExpenseCategory {
    pub const COUNT: usize = 13;

    pub const ALL: [ExpenseCategory; Self::COUNT] = [
        ExpenseCategory::Housing,
        ExpenseCategory::Transportation,
        ExpenseCategory::Food,
        ExpenseCategory::Healthcare,
        ExpenseCategory::PersonalInsurance,
        ExpenseCategory::Apparel,
        ExpenseCategory::Services,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Other,
        ExpenseCategory::Education,
        ExpenseCategory::Childcare,
        ExpenseCategory::Debt,
        ExpenseCategory::Discretionary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseCategory::Housing => "housing",
            ExpenseCategory::Transportation => "transportation",
            ExpenseCategory::Food => "food",
            ExpenseCategory::Healthcare => "healthcare",
            ExpenseCategory::PersonalInsurance => "personalInsurance",
            ExpenseCategory::Apparel => "apparel",
            ExpenseCategory::Services => "services",
            ExpenseCategory::Entertainment => "entertainment",
            ExpenseCategory::Other => "other",
            ExpenseCategory::Education => "education",
            ExpenseCategory::Childcare => "childcare",
            ExpenseCategory::Debt => "debt",
            ExpenseCategory::Discretionary => "discretionary",
        }
    }
}

/// Per-category amounts for one simulated year. Every category is always
/// present; categories nobody spent on stay at zero.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CategoryBreakdown([f64; ExpenseCategory::COUNT]);

impl CategoryBreakdown {
    pub fn add(&mut self, category: ExpenseCategory, amount: f64) {
        self.0[category.index()] += amount;
    }

    pub fn get(&self, category: ExpenseCategory) -> f64 {
        self.0[category.index()]
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Savings,
    Investment,
    Home,
    Car,
    Other,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiabilityType {
    Mortgage,
    CarLoan,
    StudentLoan,
    PersonalLoan,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    Yes,
    Partial,
    No,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeStream {
    #[serde(rename = "type")]
    pub kind: IncomeType,
    pub name: String,
    pub annual_amount: f64,
    pub growth_rate: f64,
    pub start_year: u32,
    pub end_year: Option<u32>,
}

impl IncomeStream {
    pub fn is_active(&self, year: u32) -> bool {
        year >= self.start_year && self.end_year.is_none_or(|end| year < end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expenditure {
    #[serde(rename = "type")]
    pub category: ExpenseCategory,
    pub name: String,
    pub annual_amount: f64,
    pub inflation_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub name: String,
    pub initial_value: f64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liability {
    #[serde(rename = "type")]
    pub kind: LiabilityType,
    pub name: String,
    pub initial_balance: f64,
    pub interest_rate: f64,
    pub term_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationMilestone {
    pub annual_cost: f64,
    pub annual_loan: f64,
    pub years: u32,
    pub work_status: WorkStatus,
    pub target_occupation: Option<String>,
    pub part_time_income: f64,
    pub target_income: Option<f64>,
    pub loan_interest_rate: f64,
    pub loan_term_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMilestone {
    pub income_change: f64,
}

/// Shared shape of home and car purchases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseMilestone {
    pub value: f64,
    pub down_payment: f64,
    pub monthly_payment: Option<f64>,
    pub interest_rate: Option<f64>,
    pub term_years: Option<u32>,
    pub growth_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriageMilestone {
    pub spouse_income: f64,
    pub spouse_income_growth: f64,
    pub spouse_assets: f64,
    pub spouse_debt: f64,
    pub wedding_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildMilestone {
    pub annual_cost: f64,
    pub years: u32,
    pub cost_inflation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherMilestone {
    pub one_time_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MilestoneKind {
    Education(EducationMilestone),
    Job(JobMilestone),
    Home(PurchaseMilestone),
    Car(PurchaseMilestone),
    Marriage(MarriageMilestone),
    Child(ChildMilestone),
    Other(OtherMilestone),
    /// Event data that could not be read. Kept so the scheduler can report
    /// it on the year it would have fired.
    #[serde(rename_all = "camelCase")]
    Malformed { declared_type: String, reason: String },
}

impl MilestoneKind {
    pub fn tag(&self) -> &str {
        match self {
            MilestoneKind::Education(_) => "education",
            MilestoneKind::Job(_) => "job",
            MilestoneKind::Home(_) => "home",
            MilestoneKind::Car(_) => "car",
            MilestoneKind::Marriage(_) => "marriage",
            MilestoneKind::Child(_) => "child",
            MilestoneKind::Other(_) => "other",
            MilestoneKind::Malformed { declared_type, .. } => declared_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub years_away: i64,
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: MilestoneKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRequest {
    pub start_age: u32,
    pub years_to_project: u32,
    pub path_type: PathType,
    pub cost_of_living_factor: f64,
    pub emergency_fund_amount: f64,
    pub personal_loan_term_years: u32,
    pub personal_loan_interest_rate: f64,
    pub retirement_contribution_rate: f64,
    pub retirement_growth_rate: f64,
    pub starting_retirement_balance: f64,
    pub include_retirement_in_net_worth: bool,
    pub incomes: Vec<IncomeStream>,
    pub expenditures: Vec<Expenditure>,
    pub assets: Vec<Asset>,
    pub liabilities: Vec<Liability>,
    pub milestones: Vec<Milestone>,
}

/// One simulated year, as produced by the year step.
#[derive(Debug, Clone, PartialEq)]
pub struct YearRow {
    pub age: u32,
    pub income: f64,
    pub categories: CategoryBreakdown,
    pub expenses: f64,
    pub payroll_tax: f64,
    pub federal_tax: f64,
    pub state_tax: f64,
    pub effective_tax_rate: f64,
    pub marginal_tax_rate: f64,
    pub retirement_contribution: f64,
    pub debt_service: f64,
    pub cash_flow: f64,
    pub home_value: f64,
    pub car_value: f64,
    pub savings_value: f64,
    pub other_assets_value: f64,
    pub retirement_value: f64,
    pub mortgage: f64,
    pub car_loan: f64,
    pub student_loan: f64,
    pub personal_loans: f64,
    pub assets: f64,
    pub liabilities: f64,
    pub net_worth: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSeries {
    pub housing: Vec<f64>,
    pub transportation: Vec<f64>,
    pub food: Vec<f64>,
    pub healthcare: Vec<f64>,
    pub personal_insurance: Vec<f64>,
    pub apparel: Vec<f64>,
    pub services: Vec<f64>,
    pub entertainment: Vec<f64>,
    pub other: Vec<f64>,
    pub education: Vec<f64>,
    pub childcare: Vec<f64>,
    pub debt: Vec<f64>,
    pub discretionary: Vec<f64>,
}

impl ExpenseSeries {
    pub fn series(&self, category: ExpenseCategory) -> &[f64] {
        match category {
            ExpenseCategory::Housing => &self.housing,
            ExpenseCategory::Transportation => &self.transportation,
            ExpenseCategory::Food => &self.food,
            ExpenseCategory::Healthcare => &self.healthcare,
            ExpenseCategory::PersonalInsurance => &self.personal_insurance,
            ExpenseCategory::Apparel => &self.apparel,
            ExpenseCategory::Services => &self.services,
            ExpenseCategory::Entertainment => &self.entertainment,
            ExpenseCategory::Other => &self.other,
            ExpenseCategory::Education => &self.education,
            ExpenseCategory::Childcare => &self.childcare,
            ExpenseCategory::Debt => &self.debt,
            ExpenseCategory::Discretionary => &self.discretionary,
        }
    }

    pub fn series_mut(&mut self, category: ExpenseCategory) -> &mut Vec<f64> {
        match category {
            ExpenseCategory::Housing => &mut self.housing,
            ExpenseCategory::Transportation => &mut self.transportation,
            ExpenseCategory::Food => &mut self.food,
            ExpenseCategory::Healthcare => &mut self.healthcare,
            ExpenseCategory::PersonalInsurance => &mut self.personal_insurance,
            ExpenseCategory::Apparel => &mut self.apparel,
            ExpenseCategory::Services => &mut self.services,
            ExpenseCategory::Entertainment => &mut self.entertainment,
            ExpenseCategory::Other => &mut self.other,
            ExpenseCategory::Education => &mut self.education,
            ExpenseCategory::Childcare => &mut self.childcare,
            ExpenseCategory::Debt => &mut self.debt,
            ExpenseCategory::Discretionary => &mut self.discretionary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub path_type: PathType,
    pub tax_policy: String,
    pub ages: Vec<u32>,
    pub net_worth: Vec<f64>,
    pub income: Vec<f64>,
    pub expenses: Vec<f64>,
    pub assets: Vec<f64>,
    pub liabilities: Vec<f64>,
    pub cash_flow: Vec<f64>,
    #[serde(flatten)]
    pub categories: ExpenseSeries,
    pub payroll_tax: Vec<f64>,
    pub federal_tax: Vec<f64>,
    pub state_tax: Vec<f64>,
    pub effective_tax_rate: Vec<f64>,
    pub marginal_tax_rate: Vec<f64>,
    pub retirement_contribution: Vec<f64>,
    pub debt_service: Vec<f64>,
    pub home_value: Vec<f64>,
    pub mortgage: Vec<f64>,
    pub car_value: Vec<f64>,
    pub car_loan: Vec<f64>,
    pub student_loan: Vec<f64>,
    pub personal_loans: Vec<f64>,
    pub savings_value: Vec<f64>,
    pub other_assets_value: Vec<f64>,
    pub retirement_value: Vec<f64>,
    pub warnings: Vec<MilestoneWarning>,
}
