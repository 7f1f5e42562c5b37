use tracing::{debug, info, warn};

use super::amortize::{Loan, amortize};
use super::assemble::assemble;
use super::error::{MilestoneWarning, ProjectionError, SimulationError};
use super::milestones::{Effect, IncomeLevel, SchedulerView, effects_for_year, milestone_warning};
use super::normalize::validate;
use super::tax::{TablePolicy, TaxPolicy};
use super::types::{
    AssetType, CategoryBreakdown, Expenditure, ExpenseCategory, IncomeStream, IncomeType,
    LiabilityType, ProjectionRequest, ProjectionResult, YearRow,
};

#[derive(Debug, Clone)]
struct IncomeState {
    stream: IncomeStream,
    /// Year in which the stream pays exactly `annual_amount`.
    anchor_year: u32,
}

impl IncomeState {
    fn amount(&self, year: u32) -> f64 {
        if !self.stream.is_active(year) {
            return 0.0;
        }
        let years_grown = year.saturating_sub(self.anchor_year) as f64;
        self.stream.annual_amount * (1.0 + self.stream.growth_rate).powf(years_grown)
    }
}

#[derive(Debug, Clone, Copy)]
struct IncomeWindow {
    from_year: u32,
    until_year: u32,
    level: IncomeLevel,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledExpense {
    category: ExpenseCategory,
    annual_amount: f64,
    from_year: u32,
    until_year: u32,
    inflation_rate: f64,
}

impl ScheduledExpense {
    fn amount(&self, year: u32) -> f64 {
        if year < self.from_year || year >= self.until_year {
            return 0.0;
        }
        self.annual_amount * (1.0 + self.inflation_rate).powf((year - self.from_year) as f64)
    }
}

#[derive(Debug, Clone, Copy)]
struct LoanDraw {
    loan_index: usize,
    annual_draw: f64,
    from_year: u32,
    until_year: u32,
}

#[derive(Debug, Clone, Copy)]
struct SalaryReset {
    milestone_index: usize,
    from_year: u32,
    amount: f64,
}

#[derive(Debug, Clone, Copy)]
enum SalaryChange {
    Shift(f64),
    Set(f64),
}

#[derive(Debug, Clone)]
struct HeldAsset {
    kind: AssetType,
    value: f64,
    growth_rate: f64,
    acquired_year: Option<u32>,
}

/// Money that moves into or out of savings without being cash flow.
#[derive(Debug, Default, Clone, Copy)]
struct Funding {
    inflows: f64,
    down_payments: f64,
}

#[derive(Debug, Clone)]
struct SimulationState {
    incomes: Vec<IncomeState>,
    income_windows: Vec<IncomeWindow>,
    salary_resets: Vec<SalaryReset>,
    expenditures: Vec<Expenditure>,
    scheduled_expenses: Vec<ScheduledExpense>,
    loan_draws: Vec<LoanDraw>,
    savings: f64,
    savings_growth_rate: f64,
    assets: Vec<HeldAsset>,
    loans: Vec<Loan>,
    shortfall_loan: Option<usize>,
    retirement: f64,
}

impl SimulationState {
    fn from_request(request: &ProjectionRequest) -> Self {
        let reserve_index = request
            .assets
            .iter()
            .position(|a| a.kind == AssetType::Savings)
            .or_else(|| {
                request
                    .assets
                    .iter()
                    .position(|a| a.kind == AssetType::Investment)
            });
        let (savings, savings_growth_rate) = reserve_index
            .map(|idx| {
                let reserve = &request.assets[idx];
                (reserve.initial_value.max(0.0), reserve.growth_rate)
            })
            .unwrap_or((0.0, 0.0));

        let assets = request
            .assets
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != reserve_index)
            .map(|(_, asset)| HeldAsset {
                kind: asset.kind,
                value: asset.initial_value,
                growth_rate: asset.growth_rate,
                acquired_year: None,
            })
            .collect();

        Self {
            incomes: request
                .incomes
                .iter()
                .map(|stream| IncomeState {
                    stream: stream.clone(),
                    anchor_year: 0,
                })
                .collect(),
            income_windows: Vec::new(),
            salary_resets: Vec::new(),
            expenditures: request.expenditures.clone(),
            scheduled_expenses: Vec::new(),
            loan_draws: Vec::new(),
            savings,
            savings_growth_rate,
            assets,
            loans: request.liabilities.iter().map(Loan::from_liability).collect(),
            shortfall_loan: None,
            retirement: request.starting_retirement_balance,
        }
    }

    fn stream_income(&self, year: u32) -> f64 {
        self.incomes.iter().map(|income| income.amount(year)).sum()
    }

    fn income_override(&self, year: u32) -> Option<IncomeLevel> {
        self.income_windows
            .iter()
            .rev()
            .find(|w| year >= w.from_year && year < w.until_year)
            .map(|w| w.level)
    }

    /// Ends the active salary stream at `year` and starts its successor.
    fn rebind_salary(&mut self, year: u32, change: SalaryChange) -> Result<(), String> {
        let active = self
            .incomes
            .iter()
            .position(|income| income.stream.kind == IncomeType::Salary && income.stream.is_active(year));

        let Some(idx) = active else {
            let amount = match change {
                SalaryChange::Shift(delta) | SalaryChange::Set(delta) => delta,
            };
            if amount <= 0.0 {
                return Err("no active salary stream to adjust".to_string());
            }
            self.incomes.push(IncomeState {
                stream: IncomeStream {
                    kind: IncomeType::Salary,
                    name: "Salary".to_string(),
                    annual_amount: amount,
                    growth_rate: 0.0,
                    start_year: year,
                    end_year: None,
                },
                anchor_year: year,
            });
            return Ok(());
        };

        let current = self.incomes[idx].amount(year);
        let amount = match change {
            SalaryChange::Shift(delta) => current + delta,
            SalaryChange::Set(amount) => amount,
        };
        if amount < 0.0 {
            return Err(format!(
                "salary change would make income negative ({amount:.2})"
            ));
        }

        let previous = &mut self.incomes[idx].stream;
        let successor = IncomeStream {
            kind: IncomeType::Salary,
            name: previous.name.clone(),
            annual_amount: amount,
            growth_rate: previous.growth_rate,
            start_year: year,
            end_year: previous.end_year,
        };
        previous.end_year = Some(year);
        self.incomes.push(IncomeState {
            stream: successor,
            anchor_year: year,
        });
        Ok(())
    }

    fn apply_effect(
        &mut self,
        milestone_index: usize,
        effect: Effect,
        year: u32,
        funding: &mut Funding,
    ) -> Result<(), String> {
        match effect {
            Effect::IncomeOverride {
                from_year,
                until_year,
                level,
            } => self.income_windows.push(IncomeWindow {
                from_year,
                until_year,
                level,
            }),
            Effect::JobChange { income_change } => {
                self.rebind_salary(year, SalaryChange::Shift(income_change))?;
            }
            Effect::SalaryReset { from_year, amount } => {
                if from_year <= year {
                    self.rebind_salary(year, SalaryChange::Set(amount))?;
                } else {
                    self.salary_resets.push(SalaryReset {
                        milestone_index,
                        from_year,
                        amount,
                    });
                }
            }
            Effect::AddIncome {
                stream,
                anchor_year,
            } => self.incomes.push(IncomeState {
                stream,
                anchor_year,
            }),
            Effect::AssetPurchase {
                kind,
                value,
                down_payment,
                growth_rate,
                loan,
                ..
            } => {
                self.assets.push(HeldAsset {
                    kind,
                    value,
                    growth_rate,
                    acquired_year: Some(year),
                });
                funding.down_payments += down_payment;
                if let Some(loan) = loan {
                    self.loans.push(loan);
                }
            }
            Effect::ScheduledExpense {
                category,
                annual_amount,
                from_year,
                until_year,
                inflation_rate,
            } => self.scheduled_expenses.push(ScheduledExpense {
                category,
                annual_amount,
                from_year,
                until_year,
                inflation_rate,
            }),
            Effect::LoanDraws {
                loan,
                annual_draw,
                from_year,
                until_year,
            } => {
                self.loans.push(loan);
                self.loan_draws.push(LoanDraw {
                    loan_index: self.loans.len() - 1,
                    annual_draw,
                    from_year,
                    until_year,
                });
            }
            Effect::AssumeDebt(loan) => self.loans.push(loan),
            Effect::CashTransfer(amount) => funding.inflows += amount,
        }
        Ok(())
    }

    fn liability_total(&self, kind: LiabilityType) -> f64 {
        self.loans
            .iter()
            .filter(|loan| loan.kind == kind)
            .map(|loan| loan.balance)
            .sum()
    }

    fn asset_total(&self, kinds: &[AssetType]) -> f64 {
        self.assets
            .iter()
            .filter(|asset| kinds.contains(&asset.kind))
            .map(|asset| asset.value)
            .sum()
    }
}

pub fn simulate(request: &ProjectionRequest) -> Result<ProjectionResult, ProjectionError> {
    simulate_with_policy(request, &TablePolicy::default())
}

/// Runs the year-by-year projection. Pure: identical inputs always produce
/// identical results.
pub fn simulate_with_policy(
    request: &ProjectionRequest,
    policy: &dyn TaxPolicy,
) -> Result<ProjectionResult, ProjectionError> {
    if request.years_to_project == 0 {
        return Err(SimulationError::InvalidHorizon(request.years_to_project).into());
    }
    validate(request)?;

    let mut state = SimulationState::from_request(request);
    let mut rows = Vec::with_capacity(request.years_to_project as usize + 1);
    let mut warnings = Vec::new();

    for year in 0..=request.years_to_project {
        let row = step(&mut state, year, request, policy, &mut warnings)?;
        debug!(
            year,
            age = row.age,
            income = row.income,
            cash_flow = row.cash_flow,
            net_worth = row.net_worth,
            "simulated year"
        );
        rows.push(row);
    }

    let mut result = assemble(rows, request.years_to_project as usize + 1)?;
    result.path_type = request.path_type;
    result.tax_policy = policy.version().to_string();
    result.warnings = warnings;

    info!(
        years = request.years_to_project,
        path_type = ?request.path_type,
        warnings = result.warnings.len(),
        final_net_worth = result.net_worth.last().copied().unwrap_or_default(),
        "projection complete"
    );
    Ok(result)
}

/// Advances the state by exactly one year and returns that year's row.
fn step(
    state: &mut SimulationState,
    year: u32,
    request: &ProjectionRequest,
    policy: &dyn TaxPolicy,
    warnings: &mut Vec<MilestoneWarning>,
) -> Result<YearRow, SimulationError> {
    let col = request.cost_of_living_factor;
    let mut funding = Funding::default();

    // 1. Milestone effects, including ones deferred from earlier years.
    let due_resets: Vec<SalaryReset> = state
        .salary_resets
        .iter()
        .filter(|reset| reset.from_year == year)
        .copied()
        .collect();
    state.salary_resets.retain(|reset| reset.from_year != year);
    for reset in due_resets {
        if let Err(reason) = state.rebind_salary(year, SalaryChange::Set(reset.amount)) {
            let milestone = &request.milestones[reset.milestone_index];
            warnings.push(milestone_warning(reset.milestone_index, milestone, year, reason));
        }
    }

    let view = SchedulerView {
        personal_loan_term_years: request.personal_loan_term_years,
        personal_loan_interest_rate: request.personal_loan_interest_rate,
    };
    let scheduled = effects_for_year(year, &request.milestones, view);
    warnings.extend(scheduled.warnings);
    for fired in scheduled.effects {
        let index = fired.milestone_index;
        if let Err(reason) = state.apply_effect(index, fired.effect, year, &mut funding) {
            warnings.push(milestone_warning(index, &request.milestones[index], year, reason));
        }
    }

    for draw in &state.loan_draws {
        if year >= draw.from_year && year < draw.until_year {
            state.loans[draw.loan_index].balance += draw.annual_draw;
            funding.inflows += draw.annual_draw;
        }
    }

    // 2. Gross income.
    let income = match state.income_override(year) {
        Some(IncomeLevel::Zero) => 0.0,
        Some(IncomeLevel::Replace(amount)) => amount * col,
        None => state.stream_income(year) * col,
    };

    // 3-4. Taxes and the pre-tax retirement contribution.
    let retirement_contribution = income * request.retirement_contribution_rate;
    let taxes = policy.assess(income, retirement_contribution);
    state.retirement =
        state.retirement * (1.0 + request.retirement_growth_rate) + retirement_contribution;

    // 5. Category expenses.
    let mut categories = CategoryBreakdown::default();
    let mut expenses = 0.0;
    for expenditure in &state.expenditures {
        let amount = expenditure.annual_amount
            * (1.0 + expenditure.inflation_rate).powf(year as f64)
            * col;
        categories.add(expenditure.category, amount);
        expenses += amount;
    }
    for scheduled in &state.scheduled_expenses {
        let amount = scheduled.amount(year);
        categories.add(scheduled.category, amount);
        expenses += amount;
    }

    // 6. Debt service.
    let mut debt_service = 0.0;
    for loan in &mut state.loans {
        let service = amortize(loan, year);
        loan.balance = service.new_balance;
        debt_service += service.total();
    }

    // 7. Cash flow.
    let cash_flow = income - taxes.total() - retirement_contribution - expenses - debt_service;

    // 8. Reserve policy.
    let projected_savings = state.savings * (1.0 + state.savings_growth_rate) + cash_flow
        + funding.inflows
        - funding.down_payments;
    if projected_savings < 0.0 {
        let floor = request.emergency_fund_amount.max(0.0);
        let shortfall = floor - projected_savings;
        let first_payment_year = year + 1;
        match state.shortfall_loan {
            Some(idx) => state.loans[idx].top_up(
                shortfall,
                request.personal_loan_term_years,
                first_payment_year,
            ),
            None => {
                state.loans.push(Loan {
                    kind: LiabilityType::PersonalLoan,
                    name: "Shortfall loan".to_string(),
                    balance: shortfall,
                    interest_rate: request.personal_loan_interest_rate,
                    term_years: request.personal_loan_term_years,
                    first_payment_year,
                });
                state.shortfall_loan = Some(state.loans.len() - 1);
            }
        }
        warn!(year, shortfall, floor, "savings depleted; borrowing personal loan");
        state.savings = floor;
    } else {
        state.savings = projected_savings;
    }

    // 9. Appreciation and depreciation.
    for asset in &mut state.assets {
        if asset.acquired_year != Some(year) {
            asset.value *= 1.0 + asset.growth_rate;
        }
    }

    // 10. Year row.
    let home_value = state.asset_total(&[AssetType::Home]);
    let car_value = state.asset_total(&[AssetType::Car]);
    let other_assets_value =
        state.asset_total(&[AssetType::Savings, AssetType::Investment, AssetType::Other]);
    let mortgage = state.liability_total(LiabilityType::Mortgage);
    let car_loan = state.liability_total(LiabilityType::CarLoan);
    let student_loan = state.liability_total(LiabilityType::StudentLoan);
    let personal_loans = state.liability_total(LiabilityType::PersonalLoan);

    let mut assets = home_value + car_value + state.savings + other_assets_value;
    if request.include_retirement_in_net_worth {
        assets += state.retirement;
    }
    let liabilities = mortgage + car_loan + student_loan + personal_loans;

    let row = YearRow {
        age: request.start_age + year,
        income,
        categories,
        expenses,
        payroll_tax: taxes.payroll,
        federal_tax: taxes.federal,
        state_tax: taxes.state,
        effective_tax_rate: taxes.effective_rate,
        marginal_tax_rate: taxes.marginal_rate,
        retirement_contribution,
        debt_service,
        cash_flow,
        home_value,
        car_value,
        savings_value: state.savings,
        other_assets_value,
        retirement_value: state.retirement,
        mortgage,
        car_loan,
        student_loan,
        personal_loans,
        assets,
        liabilities,
        net_worth: assets - liabilities,
    };
    ensure_finite(&row, year)?;
    Ok(row)
}

fn ensure_finite(row: &YearRow, year: u32) -> Result<(), SimulationError> {
    let checks = [
        ("income", row.income),
        ("expenses", row.expenses),
        ("taxes", row.payroll_tax + row.federal_tax + row.state_tax),
        ("retirement", row.retirement_value),
        ("debt service", row.debt_service),
        ("cash flow", row.cash_flow),
        ("savings", row.savings_value),
        ("assets", row.assets),
        ("liabilities", row.liabilities),
        ("net worth", row.net_worth),
    ];
    match checks.iter().find(|(_, value)| !value.is_finite()) {
        Some((quantity, _)) => Err(SimulationError::NonFinite {
            year,
            quantity: *quantity,
        }),
        None => Ok(()),
    }
}
