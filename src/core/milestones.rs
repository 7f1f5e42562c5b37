use tracing::warn;

use super::amortize::Loan;
use super::error::MilestoneWarning;
use super::solver::solve_implied_rate;
use super::types::{
    AssetType, ChildMilestone, EducationMilestone, ExpenseCategory, IncomeStream, IncomeType,
    JobMilestone, LiabilityType, MarriageMilestone, Milestone, MilestoneKind, OtherMilestone,
    PurchaseMilestone, WorkStatus,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncomeLevel {
    Zero,
    Replace(f64),
}

/// A state mutation derived from a milestone on the year it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replaces total income for every year in `[from_year, until_year)`.
    IncomeOverride {
        from_year: u32,
        until_year: u32,
        level: IncomeLevel,
    },
    JobChange {
        income_change: f64,
    },
    /// Re-binds the salary so that it pays `amount` in `from_year`.
    SalaryReset {
        from_year: u32,
        amount: f64,
    },
    AddIncome {
        stream: IncomeStream,
        anchor_year: u32,
    },
    AssetPurchase {
        kind: AssetType,
        name: String,
        value: f64,
        down_payment: f64,
        growth_rate: f64,
        loan: Option<Loan>,
    },
    ScheduledExpense {
        category: ExpenseCategory,
        annual_amount: f64,
        from_year: u32,
        until_year: u32,
        inflation_rate: f64,
    },
    /// Draws `annual_draw` into `loan` each year of `[from_year, until_year)`.
    LoanDraws {
        loan: Loan,
        annual_draw: f64,
        from_year: u32,
        until_year: u32,
    },
    AssumeDebt(Loan),
    CashTransfer(f64),
}

/// The parts of the request and simulation state a milestone may read.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerView {
    pub personal_loan_term_years: u32,
    pub personal_loan_interest_rate: f64,
}

#[derive(Debug)]
struct EffectContext<'a> {
    year: u32,
    label: &'a str,
    view: SchedulerView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FiredEffect {
    pub milestone_index: usize,
    pub effect: Effect,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScheduledEffects {
    pub effects: Vec<FiredEffect>,
    pub warnings: Vec<MilestoneWarning>,
}

trait MilestoneHandler {
    fn effects(&self, ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String>;
}

/// Financing defaults for a purchase milestone.
#[derive(Debug, Clone, Copy)]
struct PurchaseTerms {
    asset: AssetType,
    liability: LiabilityType,
    label: &'static str,
    term_years: u32,
    interest_rate: f64,
    growth_rate: f64,
}

const HOME_TERMS: PurchaseTerms = PurchaseTerms {
    asset: AssetType::Home,
    liability: LiabilityType::Mortgage,
    label: "Home",
    term_years: 30,
    interest_rate: 0.065,
    growth_rate: 0.03,
};

const CAR_TERMS: PurchaseTerms = PurchaseTerms {
    asset: AssetType::Car,
    liability: LiabilityType::CarLoan,
    label: "Car",
    term_years: 5,
    interest_rate: 0.07,
    growth_rate: -0.15,
};

struct Purchase<'a> {
    milestone: &'a PurchaseMilestone,
    terms: PurchaseTerms,
}

struct Malformed<'a> {
    reason: &'a str,
}

fn handler<'a>(kind: &'a MilestoneKind) -> Box<dyn MilestoneHandler + 'a> {
    match kind {
        MilestoneKind::Education(m) => Box::new(m),
        MilestoneKind::Job(m) => Box::new(m),
        MilestoneKind::Home(m) => Box::new(Purchase {
            milestone: m,
            terms: HOME_TERMS,
        }),
        MilestoneKind::Car(m) => Box::new(Purchase {
            milestone: m,
            terms: CAR_TERMS,
        }),
        MilestoneKind::Marriage(m) => Box::new(m),
        MilestoneKind::Child(m) => Box::new(m),
        MilestoneKind::Other(m) => Box::new(m),
        MilestoneKind::Malformed { reason, .. } => Box::new(Malformed {
            reason: reason.as_str(),
        }),
    }
}

/// Effects of every milestone firing in `year`, in source order.
///
/// A milestone fires once, on the year equal to its `years_away`. One that
/// cannot be applied contributes a warning instead of effects. Milestones
/// scheduled before the start are reported once, at year 0.
pub fn effects_for_year(
    year: u32,
    milestones: &[Milestone],
    view: SchedulerView,
) -> ScheduledEffects {
    let mut out = ScheduledEffects::default();
    for (index, milestone) in milestones.iter().enumerate() {
        if milestone.years_away < 0 {
            if year == 0 {
                out.warnings.push(milestone_warning(
                    index,
                    milestone,
                    0,
                    format!(
                        "scheduled {} years before the projection starts",
                        -milestone.years_away
                    ),
                ));
            }
            continue;
        }
        if milestone.years_away != i64::from(year) {
            continue;
        }

        let label = milestone
            .name
            .as_deref()
            .unwrap_or_else(|| milestone.kind.tag());
        let ctx = EffectContext { year, label, view };
        match handler(&milestone.kind).effects(&ctx) {
            Ok(effects) => out
                .effects
                .extend(effects.into_iter().map(|effect| FiredEffect {
                    milestone_index: index,
                    effect,
                })),
            Err(reason) => out
                .warnings
                .push(milestone_warning(index, milestone, year, reason)),
        }
    }
    out
}

pub(crate) fn milestone_warning(
    index: usize,
    milestone: &Milestone,
    year: u32,
    reason: String,
) -> MilestoneWarning {
    warn!(
        milestone_index = index,
        milestone_type = milestone.kind.tag(),
        year,
        %reason,
        "skipping milestone"
    );
    MilestoneWarning {
        milestone_index: index,
        milestone_type: milestone.kind.tag().to_string(),
        year,
        reason,
    }
}

fn require_non_negative(value: f64, field: &str) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{field} must be a non-negative amount, got {value}"))
    }
}

impl MilestoneHandler for &EducationMilestone {
    fn effects(&self, ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        if self.years == 0 {
            return Err("educationYears must be at least 1".to_string());
        }
        require_non_negative(self.annual_cost, "educationAnnualCost")?;
        require_non_negative(self.annual_loan, "educationAnnualLoan")?;
        require_non_negative(self.part_time_income, "partTimeIncome")?;
        require_non_negative(self.loan_interest_rate, "educationLoanInterestRate")?;
        if let Some(target) = self.target_income {
            require_non_negative(target, "targetIncome")?;
        }

        let from_year = ctx.year;
        let until_year = ctx.year.saturating_add(self.years);
        let mut effects = Vec::new();

        match self.work_status {
            WorkStatus::Yes => {}
            WorkStatus::Partial => effects.push(Effect::IncomeOverride {
                from_year,
                until_year,
                level: IncomeLevel::Replace(self.part_time_income),
            }),
            WorkStatus::No => effects.push(Effect::IncomeOverride {
                from_year,
                until_year,
                level: IncomeLevel::Zero,
            }),
        }

        if self.annual_cost > 0.0 {
            effects.push(Effect::ScheduledExpense {
                category: ExpenseCategory::Education,
                annual_amount: self.annual_cost,
                from_year,
                until_year,
                inflation_rate: 0.0,
            });
        }

        if self.annual_loan > 0.0 {
            effects.push(Effect::LoanDraws {
                loan: Loan {
                    kind: LiabilityType::StudentLoan,
                    name: format!("{} loan", ctx.label),
                    balance: 0.0,
                    interest_rate: self.loan_interest_rate,
                    term_years: self.loan_term_years,
                    first_payment_year: until_year,
                },
                annual_draw: self.annual_loan,
                from_year,
                until_year,
            });
        }

        if let Some(amount) = self.target_income {
            effects.push(Effect::SalaryReset {
                from_year: until_year,
                amount,
            });
        }

        Ok(effects)
    }
}

impl MilestoneHandler for &JobMilestone {
    fn effects(&self, _ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        if !self.income_change.is_finite() {
            return Err("income_change must be finite".to_string());
        }
        Ok(vec![Effect::JobChange {
            income_change: self.income_change,
        }])
    }
}

impl MilestoneHandler for Purchase<'_> {
    fn effects(&self, ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        let m = self.milestone;
        let label = self.terms.label.to_lowercase();
        if !(m.value.is_finite() && m.value > 0.0) {
            return Err(format!("{label} value must be positive, got {}", m.value));
        }
        require_non_negative(m.down_payment, &format!("{label} down payment"))?;
        if m.down_payment > m.value {
            return Err(format!(
                "{label} down payment {} exceeds value {}",
                m.down_payment, m.value
            ));
        }
        if m.term_years == Some(0) {
            return Err(format!("{label} loan term must be at least 1 year"));
        }
        if let Some(rate) = m.interest_rate {
            require_non_negative(rate, &format!("{label} interest rate"))?;
        }
        if let Some(payment) = m.monthly_payment {
            require_non_negative(payment, &format!("{label} monthly payment"))?;
        }
        if m.growth_rate.is_some_and(|g| !g.is_finite() || g <= -1.0) {
            return Err(format!("{label} growth rate must be finite and above -100%"));
        }

        let term_years = m.term_years.unwrap_or(self.terms.term_years);
        let principal = m.value - m.down_payment;
        let loan = (principal > 0.0).then(|| Loan {
            kind: self.terms.liability,
            name: format!("{} loan", ctx.label),
            balance: principal,
            interest_rate: purchase_rate(m, principal, term_years, self.terms),
            term_years,
            first_payment_year: ctx.year,
        });

        Ok(vec![Effect::AssetPurchase {
            kind: self.terms.asset,
            name: ctx.label.to_string(),
            value: m.value,
            down_payment: m.down_payment,
            growth_rate: m.growth_rate.unwrap_or(self.terms.growth_rate),
            loan,
        }])
    }
}

fn purchase_rate(
    m: &PurchaseMilestone,
    principal: f64,
    term_years: u32,
    terms: PurchaseTerms,
) -> f64 {
    if let Some(rate) = m.interest_rate {
        return rate;
    }
    let Some(monthly) = m.monthly_payment.filter(|p| *p > 0.0) else {
        return terms.interest_rate;
    };
    match solve_implied_rate(principal, monthly * 12.0, term_years) {
        Some(solved) => solved.rate,
        None => {
            warn!(
                monthly_payment = monthly,
                principal,
                term_years,
                "monthly payment does not imply a rate in [0, 100%]; using default"
            );
            terms.interest_rate
        }
    }
}

impl MilestoneHandler for &MarriageMilestone {
    fn effects(&self, ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        require_non_negative(self.spouse_income, "spouseIncome")?;
        require_non_negative(self.spouse_assets, "spouseAssets")?;
        require_non_negative(self.spouse_debt, "spouseDebt")?;
        require_non_negative(self.wedding_cost, "weddingCost")?;
        if !self.spouse_income_growth.is_finite() || self.spouse_income_growth <= -1.0 {
            return Err("spouseIncomeGrowth must be finite and above -100%".to_string());
        }

        let mut effects = Vec::new();
        if self.spouse_income > 0.0 {
            effects.push(Effect::AddIncome {
                stream: IncomeStream {
                    kind: IncomeType::Spouse,
                    name: format!("{} spouse income", ctx.label),
                    annual_amount: self.spouse_income,
                    growth_rate: self.spouse_income_growth,
                    start_year: ctx.year,
                    end_year: None,
                },
                anchor_year: ctx.year,
            });
        }
        if self.spouse_assets > 0.0 {
            effects.push(Effect::CashTransfer(self.spouse_assets));
        }
        if self.spouse_debt > 0.0 {
            effects.push(Effect::AssumeDebt(Loan {
                kind: LiabilityType::PersonalLoan,
                name: format!("{} spouse debt", ctx.label),
                balance: self.spouse_debt,
                interest_rate: ctx.view.personal_loan_interest_rate,
                term_years: ctx.view.personal_loan_term_years,
                first_payment_year: ctx.year,
            }));
        }
        if self.wedding_cost > 0.0 {
            effects.push(Effect::ScheduledExpense {
                category: ExpenseCategory::Other,
                annual_amount: self.wedding_cost,
                from_year: ctx.year,
                until_year: ctx.year + 1,
                inflation_rate: 0.0,
            });
        }
        Ok(effects)
    }
}

impl MilestoneHandler for &ChildMilestone {
    fn effects(&self, ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        require_non_negative(self.annual_cost, "childAnnualCost")?;
        if self.years == 0 {
            return Err("childYears must be at least 1".to_string());
        }
        if !self.cost_inflation.is_finite() || self.cost_inflation <= -1.0 {
            return Err("childCostInflation must be finite and above -100%".to_string());
        }
        Ok(vec![Effect::ScheduledExpense {
            category: ExpenseCategory::Childcare,
            annual_amount: self.annual_cost,
            from_year: ctx.year,
            until_year: ctx.year.saturating_add(self.years),
            inflation_rate: self.cost_inflation,
        }])
    }
}

impl MilestoneHandler for &OtherMilestone {
    fn effects(&self, ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        require_non_negative(self.one_time_cost, "oneTimeCost")?;
        if self.one_time_cost == 0.0 {
            return Ok(Vec::new());
        }
        Ok(vec![Effect::ScheduledExpense {
            category: ExpenseCategory::Other,
            annual_amount: self.one_time_cost,
            from_year: ctx.year,
            until_year: ctx.year + 1,
            inflation_rate: 0.0,
        }])
    }
}

impl MilestoneHandler for Malformed<'_> {
    fn effects(&self, _ctx: &EffectContext<'_>) -> Result<Vec<Effect>, String> {
        Err(self.reason.to_string())
    }
}
