use serde::Deserialize;
use serde_json::Value;

use super::error::ValidationError;
use super::types::{
    Asset, AssetType, ChildMilestone, EducationMilestone, Expenditure, ExpenseCategory,
    IncomeStream, IncomeType, JobMilestone, Liability, LiabilityType, MarriageMilestone,
    Milestone, MilestoneKind, OtherMilestone, PathType, ProjectionRequest, PurchaseMilestone,
    WorkStatus,
};

pub const MAX_YEARS_TO_PROJECT: u32 = 120;
pub const MAX_START_AGE: u32 = 130;

const DEFAULT_PERSONAL_LOAN_TERM_YEARS: u32 = 5;
const DEFAULT_EDUCATION_YEARS: u32 = 4;
const DEFAULT_EDUCATION_LOAN_TERM_YEARS: u32 = 10;
const DEFAULT_CHILD_YEARS: u32 = 18;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawProjectionRequest {
    pub start_age: Option<i64>,
    pub years_to_project: Option<i64>,
    pub path_type: Option<PathType>,
    pub cost_of_living_factor: Option<f64>,
    pub emergency_fund_amount: Option<f64>,
    pub personal_loan_term_years: Option<i64>,
    pub personal_loan_interest_rate: Option<f64>,
    pub retirement_contribution_rate: Option<f64>,
    pub retirement_growth_rate: Option<f64>,
    pub starting_retirement_balance: Option<f64>,
    pub include_retirement_in_net_worth: Option<bool>,
    pub incomes: Vec<RawIncome>,
    pub expenditures: Vec<RawExpenditure>,
    pub assets: Vec<RawAsset>,
    pub liabilities: Vec<RawLiability>,
    /// Kept as raw JSON so that one ill-typed milestone cannot reject the
    /// whole request.
    pub milestones: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawIncome {
    #[serde(rename = "type")]
    pub kind: Option<IncomeType>,
    pub name: Option<String>,
    #[serde(alias = "amount")]
    pub annual_amount: Option<f64>,
    pub growth_rate: Option<f64>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawExpenditure {
    #[serde(rename = "type")]
    pub category: Option<ExpenseCategory>,
    pub name: Option<String>,
    #[serde(alias = "amount")]
    pub annual_amount: Option<f64>,
    pub inflation_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAsset {
    #[serde(rename = "type")]
    pub kind: Option<AssetType>,
    pub name: Option<String>,
    #[serde(alias = "value")]
    pub initial_value: Option<f64>,
    pub growth_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLiability {
    #[serde(rename = "type")]
    pub kind: Option<LiabilityType>,
    pub name: Option<String>,
    #[serde(alias = "balance")]
    pub initial_balance: Option<f64>,
    pub interest_rate: Option<f64>,
    pub term_years: Option<i64>,
}

/// Milestone as sent by the planner UI: one flat record whose meaningful
/// fields depend on `type`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMilestone {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub years_away: Option<i64>,

    pub education_annual_cost: Option<f64>,
    pub education_annual_loan: Option<f64>,
    pub education_years: Option<i64>,
    pub work_status: Option<String>,
    pub target_occupation: Option<String>,
    pub part_time_income: Option<f64>,
    pub target_income: Option<f64>,
    pub education_loan_interest_rate: Option<f64>,
    pub education_loan_term_years: Option<i64>,

    #[serde(rename = "income_change", alias = "incomeChange")]
    pub income_change: Option<f64>,

    pub home_value: Option<f64>,
    pub home_down_payment: Option<f64>,
    pub home_monthly_payment: Option<f64>,
    pub home_interest_rate: Option<f64>,
    pub home_term_years: Option<i64>,
    pub home_growth_rate: Option<f64>,

    pub car_value: Option<f64>,
    pub car_down_payment: Option<f64>,
    pub car_monthly_payment: Option<f64>,
    pub car_interest_rate: Option<f64>,
    pub car_term_years: Option<i64>,
    pub car_growth_rate: Option<f64>,

    pub spouse_income: Option<f64>,
    pub spouse_income_growth: Option<f64>,
    pub spouse_assets: Option<f64>,
    pub spouse_debt: Option<f64>,
    pub wedding_cost: Option<f64>,

    pub child_annual_cost: Option<f64>,
    pub child_years: Option<i64>,
    pub child_cost_inflation: Option<f64>,

    pub one_time_cost: Option<f64>,
}

/// Fills defaults, converts milestones to their typed variants and checks
/// every global parameter. Malformed milestones do not fail the request;
/// they are carried as [`MilestoneKind::Malformed`] and reported when they
/// would have fired.
pub fn normalize(raw: RawProjectionRequest) -> Result<ProjectionRequest, ValidationError> {
    let years_to_project = match raw.years_to_project {
        None => return Err(ValidationError::new("yearsToProject", "is required")),
        Some(years) if years < 1 => {
            return Err(ValidationError::new(
                "yearsToProject",
                format!("must be >= 1, got {years}"),
            ));
        }
        Some(years) => u32::try_from(years).map_err(|_| {
            ValidationError::new("yearsToProject", format!("out of range: {years}"))
        })?,
    };
    let start_age = match raw.start_age {
        None => return Err(ValidationError::new("startAge", "is required")),
        Some(age) => u32::try_from(age)
            .map_err(|_| ValidationError::new("startAge", format!("must be >= 0, got {age}")))?,
    };

    let personal_loan_term_years = match raw.personal_loan_term_years {
        None => DEFAULT_PERSONAL_LOAN_TERM_YEARS,
        Some(term) => positive_years(term, "personalLoanTermYears")?,
    };

    let incomes = raw
        .incomes
        .into_iter()
        .enumerate()
        .map(|(idx, income)| normalize_income(idx, income))
        .collect::<Result<Vec<_>, _>>()?;

    let expenditures = raw
        .expenditures
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            let category = raw.category.unwrap_or(ExpenseCategory::Other);
            Expenditure {
                category,
                name: raw
                    .name
                    .unwrap_or_else(|| format!("{} {}", category.as_str(), idx + 1)),
                annual_amount: raw.annual_amount.unwrap_or(0.0),
                inflation_rate: raw.inflation_rate.unwrap_or(0.0),
            }
        })
        .collect();

    let assets = raw
        .assets
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| -> Result<Asset, ValidationError> {
            let kind = raw
                .kind
                .ok_or_else(|| ValidationError::new(format!("assets[{idx}].type"), "is required"))?;
            Ok(Asset {
                kind,
                name: raw.name.unwrap_or_else(|| format!("Asset {}", idx + 1)),
                initial_value: raw.initial_value.unwrap_or(0.0),
                growth_rate: raw.growth_rate.unwrap_or(0.0),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let liabilities = raw
        .liabilities
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| normalize_liability(idx, raw, personal_loan_term_years))
        .collect::<Result<Vec<_>, _>>()?;

    let milestones = raw.milestones.into_iter().map(normalize_milestone).collect();

    let request = ProjectionRequest {
        start_age,
        years_to_project,
        path_type: raw.path_type.unwrap_or_default(),
        cost_of_living_factor: raw.cost_of_living_factor.unwrap_or(1.0),
        emergency_fund_amount: raw.emergency_fund_amount.unwrap_or(0.0),
        personal_loan_term_years,
        personal_loan_interest_rate: raw.personal_loan_interest_rate.unwrap_or(0.0),
        retirement_contribution_rate: raw.retirement_contribution_rate.unwrap_or(0.0),
        retirement_growth_rate: raw.retirement_growth_rate.unwrap_or(0.0),
        starting_retirement_balance: raw.starting_retirement_balance.unwrap_or(0.0),
        include_retirement_in_net_worth: raw.include_retirement_in_net_worth.unwrap_or(false),
        incomes,
        expenditures,
        assets,
        liabilities,
        milestones,
    };
    validate(&request)?;
    Ok(request)
}

/// Checks the global parameters of an already-typed request.
pub fn validate(request: &ProjectionRequest) -> Result<(), ValidationError> {
    if request.years_to_project < 1 {
        return Err(ValidationError::new("yearsToProject", "must be >= 1"));
    }
    if request.years_to_project > MAX_YEARS_TO_PROJECT {
        return Err(ValidationError::new(
            "yearsToProject",
            format!("must be <= {MAX_YEARS_TO_PROJECT}"),
        ));
    }
    if request.start_age > MAX_START_AGE {
        return Err(ValidationError::new(
            "startAge",
            format!("must be <= {MAX_START_AGE}"),
        ));
    }
    if !(request.cost_of_living_factor.is_finite() && request.cost_of_living_factor > 0.0) {
        return Err(ValidationError::new(
            "costOfLivingFactor",
            "must be finite and > 0",
        ));
    }
    amount(request.emergency_fund_amount, "emergencyFundAmount")?;
    if request.personal_loan_term_years == 0 {
        return Err(ValidationError::new("personalLoanTermYears", "must be > 0"));
    }
    interest_rate(
        request.personal_loan_interest_rate,
        "personalLoanInterestRate",
    )?;
    if !(0.0..=1.0).contains(&request.retirement_contribution_rate) {
        return Err(ValidationError::new(
            "retirementContributionRate",
            "must be within [0, 1]",
        ));
    }
    growth_rate(request.retirement_growth_rate, "retirementGrowthRate")?;
    amount(
        request.starting_retirement_balance,
        "startingRetirementBalance",
    )?;

    for (idx, income) in request.incomes.iter().enumerate() {
        amount(income.annual_amount, &format!("incomes[{idx}].annualAmount"))?;
        growth_rate(income.growth_rate, &format!("incomes[{idx}].growthRate"))?;
        if income.end_year.is_some_and(|end| end < income.start_year) {
            return Err(ValidationError::new(
                format!("incomes[{idx}].endYear"),
                "must not precede startYear",
            ));
        }
    }
    for (idx, expenditure) in request.expenditures.iter().enumerate() {
        amount(
            expenditure.annual_amount,
            &format!("expenditures[{idx}].annualAmount"),
        )?;
        growth_rate(
            expenditure.inflation_rate,
            &format!("expenditures[{idx}].inflationRate"),
        )?;
    }
    for (idx, asset) in request.assets.iter().enumerate() {
        amount(asset.initial_value, &format!("assets[{idx}].initialValue"))?;
        growth_rate(asset.growth_rate, &format!("assets[{idx}].growthRate"))?;
    }
    for (idx, liability) in request.liabilities.iter().enumerate() {
        amount(
            liability.initial_balance,
            &format!("liabilities[{idx}].initialBalance"),
        )?;
        interest_rate(
            liability.interest_rate,
            &format!("liabilities[{idx}].interestRate"),
        )?;
        if liability.term_years == 0 {
            return Err(ValidationError::new(
                format!("liabilities[{idx}].termYears"),
                "must be > 0",
            ));
        }
    }
    Ok(())
}

fn amount(value: f64, field: &str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be finite and >= 0, got {value}"),
        ))
    }
}

fn growth_rate(value: f64, field: &str) -> Result<(), ValidationError> {
    if value.is_finite() && value > -1.0 {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be finite and > -1, got {value}"),
        ))
    }
}

fn interest_rate(value: f64, field: &str) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(
            field,
            format!("must be finite and >= 0, got {value}"),
        ))
    }
}

fn positive_years(value: i64, field: &str) -> Result<u32, ValidationError> {
    match u32::try_from(value) {
        Ok(years) if years > 0 => Ok(years),
        _ => Err(ValidationError::new(
            field,
            format!("must be > 0, got {value}"),
        )),
    }
}

fn non_negative_year(value: i64, field: &str) -> Result<u32, ValidationError> {
    u32::try_from(value)
        .map_err(|_| ValidationError::new(field, format!("must be >= 0, got {value}")))
}

fn normalize_income(idx: usize, raw: RawIncome) -> Result<IncomeStream, ValidationError> {
    let kind = raw.kind.unwrap_or(IncomeType::Salary);
    let start_year = match raw.start_year {
        None => 0,
        Some(year) => non_negative_year(year, &format!("incomes[{idx}].startYear"))?,
    };
    let end_year = raw
        .end_year
        .map(|year| non_negative_year(year, &format!("incomes[{idx}].endYear")))
        .transpose()?;
    Ok(IncomeStream {
        kind,
        name: raw.name.unwrap_or_else(|| format!("Income {}", idx + 1)),
        annual_amount: raw.annual_amount.unwrap_or(0.0),
        growth_rate: raw.growth_rate.unwrap_or(0.0),
        start_year,
        end_year,
    })
}

fn normalize_liability(
    idx: usize,
    raw: RawLiability,
    personal_loan_term_years: u32,
) -> Result<Liability, ValidationError> {
    let kind = raw
        .kind
        .ok_or_else(|| ValidationError::new(format!("liabilities[{idx}].type"), "is required"))?;
    let term_years = match raw.term_years {
        Some(term) => positive_years(term, &format!("liabilities[{idx}].termYears"))?,
        None => match kind {
            LiabilityType::Mortgage => 30,
            LiabilityType::CarLoan => 5,
            LiabilityType::StudentLoan => DEFAULT_EDUCATION_LOAN_TERM_YEARS,
            LiabilityType::PersonalLoan => personal_loan_term_years,
        },
    };
    Ok(Liability {
        kind,
        name: raw.name.unwrap_or_else(|| format!("Liability {}", idx + 1)),
        initial_balance: raw.initial_balance.unwrap_or(0.0),
        interest_rate: raw.interest_rate.unwrap_or(0.0),
        term_years,
    })
}

fn normalize_milestone(value: Value) -> Milestone {
    let years_away = value.get("yearsAway").and_then(Value::as_i64);
    let declared_type = value
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string);

    match serde_json::from_value::<RawMilestone>(value) {
        Ok(raw) => typed_milestone(raw),
        Err(e) => Milestone {
            years_away: years_away.unwrap_or(0),
            name,
            kind: MilestoneKind::Malformed {
                declared_type,
                reason: e.to_string(),
            },
        },
    }
}

fn typed_milestone(raw: RawMilestone) -> Milestone {
    let declared_type = raw
        .kind
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    let name = raw.name.clone();

    let Some(years_away) = raw.years_away else {
        return Milestone {
            years_away: 0,
            name,
            kind: MilestoneKind::Malformed {
                declared_type,
                reason: "yearsAway is required".to_string(),
            },
        };
    };

    let kind = milestone_kind(&declared_type, raw).unwrap_or_else(|reason| {
        MilestoneKind::Malformed {
            declared_type: declared_type.clone(),
            reason,
        }
    });
    Milestone {
        years_away,
        name,
        kind,
    }
}

fn milestone_kind(declared_type: &str, raw: RawMilestone) -> Result<MilestoneKind, String> {
    match declared_type {
        "education" => {
            let work_status = match raw.work_status.as_deref().map(str::trim) {
                None => WorkStatus::Yes,
                Some(s) if s.eq_ignore_ascii_case("yes") => WorkStatus::Yes,
                Some(s) if s.eq_ignore_ascii_case("partial") => WorkStatus::Partial,
                Some(s) if s.eq_ignore_ascii_case("no") => WorkStatus::No,
                Some(other) => return Err(format!("unknown workStatus {other:?}")),
            };
            Ok(MilestoneKind::Education(EducationMilestone {
                annual_cost: raw.education_annual_cost.unwrap_or(0.0),
                annual_loan: raw.education_annual_loan.unwrap_or(0.0),
                years: milestone_years(raw.education_years, DEFAULT_EDUCATION_YEARS, "educationYears")?,
                work_status,
                target_occupation: raw.target_occupation,
                part_time_income: raw.part_time_income.unwrap_or(0.0),
                target_income: raw.target_income,
                loan_interest_rate: raw.education_loan_interest_rate.unwrap_or(0.0),
                loan_term_years: milestone_years(
                    raw.education_loan_term_years,
                    DEFAULT_EDUCATION_LOAN_TERM_YEARS,
                    "educationLoanTermYears",
                )?,
            }))
        }
        "job" => {
            let income_change = raw
                .income_change
                .ok_or_else(|| "income_change is required".to_string())?;
            Ok(MilestoneKind::Job(JobMilestone { income_change }))
        }
        "home" => Ok(MilestoneKind::Home(PurchaseMilestone {
            value: raw
                .home_value
                .ok_or_else(|| "homeValue is required".to_string())?,
            down_payment: raw.home_down_payment.unwrap_or(0.0),
            monthly_payment: raw.home_monthly_payment,
            interest_rate: raw.home_interest_rate,
            term_years: optional_years(raw.home_term_years, "homeTermYears")?,
            growth_rate: raw.home_growth_rate,
        })),
        "car" => Ok(MilestoneKind::Car(PurchaseMilestone {
            value: raw
                .car_value
                .ok_or_else(|| "carValue is required".to_string())?,
            down_payment: raw.car_down_payment.unwrap_or(0.0),
            monthly_payment: raw.car_monthly_payment,
            interest_rate: raw.car_interest_rate,
            term_years: optional_years(raw.car_term_years, "carTermYears")?,
            growth_rate: raw.car_growth_rate,
        })),
        "marriage" => Ok(MilestoneKind::Marriage(MarriageMilestone {
            spouse_income: raw.spouse_income.unwrap_or(0.0),
            spouse_income_growth: raw.spouse_income_growth.unwrap_or(0.0),
            spouse_assets: raw.spouse_assets.unwrap_or(0.0),
            spouse_debt: raw.spouse_debt.unwrap_or(0.0),
            wedding_cost: raw.wedding_cost.unwrap_or(0.0),
        })),
        "child" => Ok(MilestoneKind::Child(ChildMilestone {
            annual_cost: raw
                .child_annual_cost
                .ok_or_else(|| "childAnnualCost is required".to_string())?,
            years: milestone_years(raw.child_years, DEFAULT_CHILD_YEARS, "childYears")?,
            cost_inflation: raw.child_cost_inflation.unwrap_or(0.0),
        })),
        "other" => Ok(MilestoneKind::Other(OtherMilestone {
            one_time_cost: raw.one_time_cost.unwrap_or(0.0),
        })),
        other => Err(format!("unknown milestone type {other:?}")),
    }
}

fn milestone_years(value: Option<i64>, default: u32, field: &str) -> Result<u32, String> {
    match value {
        None => Ok(default),
        Some(years) => u32::try_from(years)
            .ok()
            .filter(|years| *years > 0)
            .ok_or_else(|| format!("{field} must be > 0, got {years}")),
    }
}

fn optional_years(value: Option<i64>, field: &str) -> Result<Option<u32>, String> {
    value
        .map(|years| milestone_years(Some(years), 0, field))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_from_json(json: &str) -> RawProjectionRequest {
        serde_json::from_str(json).expect("valid raw JSON")
    }

    fn minimal_raw() -> RawProjectionRequest {
        raw_from_json(r#"{"startAge": 22, "yearsToProject": 5}"#)
    }

    #[test]
    fn fills_defaults_for_missing_fields() {
        let request = normalize(minimal_raw()).expect("valid request");
        assert_eq!(request.start_age, 22);
        assert_eq!(request.years_to_project, 5);
        assert_eq!(request.path_type, PathType::Baseline);
        assert_eq!(request.cost_of_living_factor, 1.0);
        assert_eq!(request.emergency_fund_amount, 0.0);
        assert_eq!(request.personal_loan_term_years, 5);
        assert_eq!(request.personal_loan_interest_rate, 0.0);
        assert_eq!(request.retirement_contribution_rate, 0.0);
        assert!(!request.include_retirement_in_net_worth);
        assert!(request.incomes.is_empty());
    }

    #[test]
    fn income_defaults_to_open_ended_salary() {
        let request = normalize(raw_from_json(
            r#"{"startAge": 22, "yearsToProject": 5,
                "incomes": [{"name": "Barista", "annualAmount": 28000}]}"#,
        ))
        .expect("valid request");
        let income = &request.incomes[0];
        assert_eq!(income.kind, IncomeType::Salary);
        assert_eq!(income.growth_rate, 0.0);
        assert_eq!(income.start_year, 0);
        assert_eq!(income.end_year, None);
    }

    #[test]
    fn rejects_missing_or_short_horizon() {
        let err = normalize(raw_from_json(r#"{"startAge": 22}"#)).expect_err("missing horizon");
        assert_eq!(err.field, "yearsToProject");

        let err = normalize(raw_from_json(r#"{"startAge": 22, "yearsToProject": 0}"#))
            .expect_err("zero horizon");
        assert_eq!(err.field, "yearsToProject");

        let err = normalize(raw_from_json(r#"{"startAge": 22, "yearsToProject": -3}"#))
            .expect_err("negative horizon");
        assert!(err.reason.contains("-3"));
    }

    #[test]
    fn rejects_horizon_above_cap() {
        let err = normalize(raw_from_json(r#"{"startAge": 22, "yearsToProject": 500}"#))
            .expect_err("horizon too long");
        assert_eq!(err.field, "yearsToProject");
    }

    #[test]
    fn rejects_non_finite_growth_rate() {
        let mut request = normalize(minimal_raw()).expect("valid request");
        request.incomes.push(IncomeStream {
            kind: IncomeType::Salary,
            name: "Job".to_string(),
            annual_amount: 50_000.0,
            growth_rate: f64::NAN,
            start_year: 0,
            end_year: None,
        });
        let err = validate(&request).expect_err("NaN growth");
        assert_eq!(err.field, "incomes[0].growthRate");
    }

    #[test]
    fn rejects_non_finite_interest_rate() {
        let mut request = normalize(minimal_raw()).expect("valid request");
        request.liabilities.push(Liability {
            kind: LiabilityType::StudentLoan,
            name: "Loan".to_string(),
            initial_balance: 10_000.0,
            interest_rate: f64::INFINITY,
            term_years: 10,
        });
        let err = validate(&request).expect_err("infinite rate");
        assert_eq!(err.field, "liabilities[0].interestRate");
    }

    #[test]
    fn liability_term_defaults_by_type() {
        let request = normalize(raw_from_json(
            r#"{"startAge": 30, "yearsToProject": 3, "personalLoanTermYears": 3,
                "liabilities": [
                    {"type": "mortgage", "initialBalance": 1000},
                    {"type": "car_loan", "balance": 1000},
                    {"type": "student_loan", "initialBalance": 1000},
                    {"type": "personal_loan", "initialBalance": 1000}
                ]}"#,
        ))
        .expect("valid request");
        let terms: Vec<u32> = request.liabilities.iter().map(|l| l.term_years).collect();
        assert_eq!(terms, vec![30, 5, 10, 3]);
    }

    #[test]
    fn liability_without_type_is_rejected() {
        let err = normalize(raw_from_json(
            r#"{"startAge": 30, "yearsToProject": 3, "liabilities": [{"initialBalance": 10}]}"#,
        ))
        .expect_err("missing type");
        assert_eq!(err.field, "liabilities[0].type");
    }

    #[test]
    fn flat_milestone_fields_become_typed_variants() {
        let request = normalize(raw_from_json(
            r#"{"startAge": 18, "yearsToProject": 10, "milestones": [
                {"type": "education", "yearsAway": 0, "educationAnnualCost": 20000,
                 "educationAnnualLoan": 8000, "educationYears": 4, "workStatus": "partial",
                 "targetOccupation": "Engineer", "partTimeIncome": 12000},
                {"type": "job", "yearsAway": 4, "income_change": 15000},
                {"type": "home", "yearsAway": 8, "homeValue": 300000,
                 "homeDownPayment": 30000, "homeMonthlyPayment": 1800},
                {"type": "car", "yearsAway": 5, "carValue": 25000}
            ]}"#,
        ))
        .expect("valid request");

        let MilestoneKind::Education(education) = &request.milestones[0].kind else {
            panic!("expected education");
        };
        assert_eq!(education.work_status, WorkStatus::Partial);
        assert_eq!(education.years, 4);
        assert_eq!(education.target_occupation.as_deref(), Some("Engineer"));
        assert_eq!(education.loan_term_years, 10);

        assert_eq!(
            request.milestones[1].kind,
            MilestoneKind::Job(JobMilestone {
                income_change: 15_000.0
            })
        );

        let MilestoneKind::Home(home) = &request.milestones[2].kind else {
            panic!("expected home");
        };
        assert_eq!(home.value, 300_000.0);
        assert_eq!(home.monthly_payment, Some(1_800.0));

        let MilestoneKind::Car(car) = &request.milestones[3].kind else {
            panic!("expected car");
        };
        assert_eq!(car.down_payment, 0.0);
        assert_eq!(car.term_years, None);
    }

    #[test]
    fn bad_milestones_are_kept_as_malformed() {
        let request = normalize(raw_from_json(
            r#"{"startAge": 18, "yearsToProject": 10, "milestones": [
                {"type": "vacation", "yearsAway": 2},
                {"type": "job", "yearsAway": 3},
                {"type": "education", "yearsAway": 1, "workStatus": "sometimes"},
                {"type": "home", "homeValue": 100000}
            ]}"#,
        ))
        .expect("malformed milestones never fail the request");

        let reasons: Vec<&str> = request
            .milestones
            .iter()
            .map(|m| match &m.kind {
                MilestoneKind::Malformed { reason, .. } => reason.as_str(),
                other => panic!("expected malformed, got {other:?}"),
            })
            .collect();
        assert!(reasons[0].contains("unknown milestone type"));
        assert!(reasons[1].contains("income_change"));
        assert!(reasons[2].contains("workStatus"));
        assert!(reasons[3].contains("yearsAway"));
        assert_eq!(request.milestones[0].years_away, 2);
    }

    #[test]
    fn ill_typed_milestone_field_only_marks_that_milestone() {
        let request = normalize(raw_from_json(
            r#"{"startAge": 18, "yearsToProject": 10, "milestones": [
                {"type": "home", "yearsAway": 1, "homeValue": "300000"},
                {"type": "car", "yearsAway": 2.5, "carValue": 20000},
                {"type": "education", "yearsAway": 3, "workStatus": 1},
                42,
                {"type": "other", "yearsAway": 4, "oneTimeCost": 500}
            ]}"#,
        ))
        .expect("ill-typed milestones never fail the request");

        assert_eq!(request.milestones.len(), 5);
        for milestone in &request.milestones[..4] {
            assert!(
                matches!(milestone.kind, MilestoneKind::Malformed { .. }),
                "expected malformed, got {:?}",
                milestone.kind
            );
        }
        let MilestoneKind::Malformed { declared_type, .. } = &request.milestones[0].kind else {
            unreachable!();
        };
        assert_eq!(declared_type, "home");
        assert_eq!(request.milestones[0].years_away, 1);
        assert_eq!(request.milestones[2].years_away, 3);
        assert_eq!(request.milestones[3].kind.tag(), "unknown");
        assert!(matches!(
            request.milestones[4].kind,
            MilestoneKind::Other(OtherMilestone { one_time_cost }) if one_time_cost == 500.0
        ));
    }
}
