use super::types::{Liability, LiabilityType};

const BALANCE_EPS: f64 = 1e-6;

/// A liability as tracked through the simulation.
///
/// Payments run for `term_years` years starting at `first_payment_year`.
/// Before that year the loan is in deferment and interest capitalizes.
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    pub kind: LiabilityType,
    pub name: String,
    pub balance: f64,
    pub interest_rate: f64,
    pub term_years: u32,
    pub first_payment_year: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebtService {
    pub interest_paid: f64,
    pub principal_paid: f64,
    pub new_balance: f64,
}

impl DebtService {
    pub fn total(self) -> f64 {
        self.interest_paid + self.principal_paid
    }

    fn idle(balance: f64) -> Self {
        Self {
            interest_paid: 0.0,
            principal_paid: 0.0,
            new_balance: balance,
        }
    }
}

impl Loan {
    pub fn from_liability(liability: &Liability) -> Self {
        Self {
            kind: liability.kind,
            name: liability.name.clone(),
            balance: liability.initial_balance.max(0.0),
            interest_rate: liability.interest_rate,
            term_years: liability.term_years,
            first_payment_year: 0,
        }
    }

    pub fn years_remaining(&self, year: u32) -> u32 {
        if year < self.first_payment_year {
            return self.term_years;
        }
        self.term_years
            .saturating_sub(year - self.first_payment_year)
    }

    pub fn is_terminal(&self, year: u32) -> bool {
        self.balance <= BALANCE_EPS
            || (year >= self.first_payment_year && self.years_remaining(year) == 0)
    }

    /// Adds principal and restarts the schedule over a fresh term.
    pub fn top_up(&mut self, amount: f64, term_years: u32, first_payment_year: u32) {
        self.balance += amount.max(0.0);
        self.term_years = term_years;
        self.first_payment_year = first_payment_year;
    }
}

/// Level annual payment that retires `principal` over `term_years` at `rate`.
pub fn fixed_payment(principal: f64, rate: f64, term_years: u32) -> f64 {
    if principal <= 0.0 {
        return 0.0;
    }
    if term_years == 0 {
        return principal;
    }
    let n = term_years as f64;
    if rate.abs() < 1e-12 {
        return principal / n;
    }
    principal * rate / (1.0 - (1.0 + rate).powf(-n))
}

/// One year of debt service for `loan` in simulation year `year`.
///
/// The payment is re-derived from the current balance over the remaining
/// term, which reproduces the original level payment on an undisturbed
/// schedule and re-levels it after a top-up. The final scheduled payment
/// clears the balance exactly.
pub fn amortize(loan: &Loan, year: u32) -> DebtService {
    if loan.balance <= BALANCE_EPS {
        return DebtService::idle(0.0);
    }
    if year < loan.first_payment_year {
        return DebtService::idle(loan.balance * (1.0 + loan.interest_rate));
    }

    if loan.is_terminal(year) {
        return DebtService::idle(loan.balance);
    }

    let remaining = loan.years_remaining(year);

    let interest_paid = loan.balance * loan.interest_rate;
    let principal_paid = if remaining == 1 {
        loan.balance
    } else {
        let payment = fixed_payment(loan.balance, loan.interest_rate, remaining);
        (payment - interest_paid).clamp(0.0, loan.balance)
    };
    let new_balance = (loan.balance - principal_paid).max(0.0);

    DebtService {
        interest_paid,
        principal_paid,
        new_balance: if new_balance <= BALANCE_EPS {
            0.0
        } else {
            new_balance
        },
    }
}
