use super::amortize::fixed_payment;

const RATE_SEARCH_MAX: f64 = 1.0;
const RATE_TOLERANCE: f64 = 1e-10;
const MAX_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSolveResult {
    pub rate: f64,
    pub iterations: u32,
    pub converged: bool,
}

/// Annual interest rate at which a level `annual_payment` retires
/// `principal` in exactly `term_years`.
///
/// Returns `None` when the payment cannot retire the loan at any rate in
/// `[0, 100%]`: either it is too small to cover principal at a zero rate,
/// or it exceeds what even the maximum rate would require.
pub fn solve_implied_rate(
    principal: f64,
    annual_payment: f64,
    term_years: u32,
) -> Option<RateSolveResult> {
    if principal <= 0.0 || annual_payment <= 0.0 || term_years == 0 {
        return None;
    }

    let low_payment = fixed_payment(principal, 0.0, term_years);
    let high_payment = fixed_payment(principal, RATE_SEARCH_MAX, term_years);

    if annual_payment + 1e-9 < low_payment || annual_payment > high_payment + 1e-9 {
        return None;
    }
    if (annual_payment - low_payment).abs() <= 1e-9 {
        return Some(RateSolveResult {
            rate: 0.0,
            iterations: 0,
            converged: true,
        });
    }

    let mut lo = 0.0;
    let mut hi = RATE_SEARCH_MAX;
    let mut it = 0;
    let mut converged = false;
    while it < MAX_ITERATIONS {
        it += 1;
        let mid = (lo + hi) * 0.5;
        if fixed_payment(principal, mid, term_years) >= annual_payment {
            hi = mid;
        } else {
            lo = mid;
        }

        if (hi - lo).abs() <= RATE_TOLERANCE {
            converged = true;
            break;
        }
    }

    Some(RateSolveResult {
        rate: (lo + hi) * 0.5,
        iterations: it,
        converged,
    })
}
