use super::error::ValidationError;

/// Employee share of Social Security plus Medicare.
pub const PAYROLL_RATE: f64 = 0.0765;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    /// Taxable income above which `rate` applies.
    pub floor: f64,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketTax {
    pub tax: f64,
    pub marginal_rate: f64,
}

/// A progressive schedule: a flat deduction followed by brackets with
/// ascending floors and non-decreasing rates.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketSchedule {
    deduction: f64,
    brackets: Vec<Bracket>,
}

impl BracketSchedule {
    pub fn new(deduction: f64, brackets: &[(f64, f64)]) -> Result<Self, ValidationError> {
        if !deduction.is_finite() || deduction < 0.0 {
            return Err(ValidationError::new(
                "taxPolicy.deduction",
                "must be finite and >= 0",
            ));
        }
        if brackets.is_empty() {
            return Err(ValidationError::new(
                "taxPolicy.brackets",
                "at least one bracket is required",
            ));
        }
        if brackets[0].0 != 0.0 {
            return Err(ValidationError::new(
                "taxPolicy.brackets",
                "first bracket must start at 0",
            ));
        }
        for (idx, pair) in brackets.windows(2).enumerate() {
            let (floor, rate) = pair[0];
            let (next_floor, next_rate) = pair[1];
            if next_floor <= floor {
                return Err(ValidationError::new(
                    format!("taxPolicy.brackets[{}]", idx + 1),
                    "floors must be strictly ascending",
                ));
            }
            if next_rate < rate {
                return Err(ValidationError::new(
                    format!("taxPolicy.brackets[{}]", idx + 1),
                    "rates must not decrease",
                ));
            }
        }
        if brackets
            .iter()
            .any(|(floor, rate)| !floor.is_finite() || !(0.0..=1.0).contains(rate))
        {
            return Err(ValidationError::new(
                "taxPolicy.brackets",
                "floors must be finite and rates within [0, 1]",
            ));
        }

        Ok(Self::from_table(deduction, brackets))
    }

    fn from_table(deduction: f64, brackets: &[(f64, f64)]) -> Self {
        Self {
            deduction,
            brackets: brackets
                .iter()
                .map(|&(floor, rate)| Bracket { floor, rate })
                .collect(),
        }
    }

    pub fn assess(&self, income: f64) -> BracketTax {
        let taxable = (income - self.deduction).max(0.0);
        let mut tax = 0.0;
        let mut marginal_rate = 0.0;
        for (idx, bracket) in self.brackets.iter().enumerate() {
            if taxable <= bracket.floor {
                break;
            }
            let ceiling = self
                .brackets
                .get(idx + 1)
                .map(|next| next.floor)
                .unwrap_or(f64::INFINITY);
            tax += (taxable.min(ceiling) - bracket.floor) * bracket.rate;
            marginal_rate = bracket.rate;
        }
        BracketTax { tax, marginal_rate }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaxAssessment {
    pub payroll: f64,
    pub federal: f64,
    pub state: f64,
    pub effective_rate: f64,
    pub marginal_rate: f64,
}

impl TaxAssessment {
    pub fn total(self) -> f64 {
        self.payroll + self.federal + self.state
    }
}

/// Converts a year's gross income into taxes owed.
///
/// `pre_tax_deductions` (retirement contributions) reduce the income
/// subject to federal and state tax but not payroll tax.
pub trait TaxPolicy: Send + Sync {
    fn version(&self) -> &str;

    fn assess(&self, gross_income: f64, pre_tax_deductions: f64) -> TaxAssessment;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TablePolicy {
    version: String,
    payroll_rate: f64,
    federal: BracketSchedule,
    state: BracketSchedule,
}

impl TablePolicy {
    pub fn new(
        version: impl Into<String>,
        payroll_rate: f64,
        federal: BracketSchedule,
        state: BracketSchedule,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&payroll_rate) {
            return Err(ValidationError::new(
                "taxPolicy.payrollRate",
                "must be within [0, 1]",
            ));
        }
        Ok(Self {
            version: version.into(),
            payroll_rate,
            federal,
            state,
        })
    }

    /// 2024 federal single-filer brackets with the standard deduction, and a
    /// generic three-bracket state schedule.
    pub fn us_2024_single() -> Self {
        Self {
            version: "us-2024-single".to_string(),
            payroll_rate: PAYROLL_RATE,
            federal: BracketSchedule::from_table(
                14_600.0,
                &[
                    (0.0, 0.10),
                    (11_600.0, 0.12),
                    (47_150.0, 0.22),
                    (100_525.0, 0.24),
                    (191_950.0, 0.32),
                    (243_725.0, 0.35),
                    (609_350.0, 0.37),
                ],
            ),
            state: BracketSchedule::from_table(
                0.0,
                &[(0.0, 0.02), (10_000.0, 0.04), (50_000.0, 0.055)],
            ),
        }
    }
}

impl Default for TablePolicy {
    fn default() -> Self {
        Self::us_2024_single()
    }
}

impl TaxPolicy for TablePolicy {
    fn version(&self) -> &str {
        &self.version
    }

    fn assess(&self, gross_income: f64, pre_tax_deductions: f64) -> TaxAssessment {
        let gross = gross_income.max(0.0);
        if gross <= 0.0 {
            return TaxAssessment::default();
        }
        let taxable = (gross - pre_tax_deductions.max(0.0)).max(0.0);

        let payroll = gross * self.payroll_rate;
        let federal = self.federal.assess(taxable);
        let state = self.state.assess(taxable);
        let total = payroll + federal.tax + state.tax;

        TaxAssessment {
            payroll,
            federal: federal.tax,
            state: state.tax,
            effective_rate: total / gross,
            marginal_rate: self.payroll_rate + federal.marginal_rate + state.marginal_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn us_2024_policy_taxes_sixty_thousand() {
        let taxes = TablePolicy::us_2024_single().assess(60_000.0, 0.0);
        assert_approx(taxes.payroll, 4_590.0);
        // 45,400 taxable: 1,160 at 10% + 4,056 at 12%.
        assert_approx(taxes.federal, 5_216.0);
        assert_approx(taxes.state, 2_350.0);
        assert_approx(taxes.marginal_rate, 0.0765 + 0.12 + 0.055);
        assert_approx(taxes.effective_rate, (4_590.0 + 5_216.0 + 2_350.0) / 60_000.0);
    }

    #[test]
    fn pre_tax_deductions_lower_income_tax_but_not_payroll() {
        let policy = TablePolicy::us_2024_single();
        let plain = policy.assess(60_000.0, 0.0);
        let deducted = policy.assess(60_000.0, 6_000.0);
        assert_approx(deducted.payroll, plain.payroll);
        assert!(deducted.federal < plain.federal);
        assert!(deducted.state < plain.state);
    }

    #[test]
    fn income_below_deduction_has_no_federal_marginal_rate() {
        let taxes = TablePolicy::us_2024_single().assess(10_000.0, 0.0);
        assert_eq!(taxes.federal, 0.0);
        assert_approx(taxes.marginal_rate, 0.0765 + 0.02);
    }

    #[test]
    fn zero_income_is_untaxed() {
        let taxes = TablePolicy::us_2024_single().assess(0.0, 0.0);
        assert_eq!(taxes, TaxAssessment::default());
    }

    #[test]
    fn schedule_rejects_decreasing_rates() {
        let err = BracketSchedule::new(0.0, &[(0.0, 0.2), (10_000.0, 0.1)])
            .expect_err("must reject regressive table");
        assert!(err.field.contains("brackets[1]"));
    }

    #[test]
    fn schedule_rejects_unsorted_floors() {
        assert!(BracketSchedule::new(0.0, &[(0.0, 0.1), (5_000.0, 0.2), (5_000.0, 0.3)]).is_err());
        assert!(BracketSchedule::new(0.0, &[(100.0, 0.1)]).is_err());
    }

    #[test]
    fn custom_policy_uses_its_own_table() {
        let flat = BracketSchedule::new(0.0, &[(0.0, 0.1)]).expect("valid");
        let none = BracketSchedule::new(0.0, &[(0.0, 0.0)]).expect("valid");
        let policy = TablePolicy::new("flat-10", 0.0, flat, none).expect("valid");
        let taxes = policy.assess(50_000.0, 0.0);
        assert_eq!(policy.version(), "flat-10");
        assert_approx(taxes.federal, 5_000.0);
        assert_approx(taxes.total(), 5_000.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_effective_rate_rises_with_income(low in 1u32..400_000, extra in 1u32..400_000) {
            let policy = TablePolicy::us_2024_single();
            let a = policy.assess(low as f64, 0.0);
            let b = policy.assess((low + extra) as f64, 0.0);
            prop_assert!(b.effective_rate + 1e-12 >= a.effective_rate);
            prop_assert!(b.marginal_rate + 1e-12 >= a.marginal_rate);
            prop_assert!(a.effective_rate <= a.marginal_rate + 1e-12);
        }
    }
}
