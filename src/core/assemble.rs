use super::error::ConsistencyError;
use super::types::{ExpenseCategory, ProjectionResult, YearRow};

const CATEGORY_TOLERANCE: f64 = 1e-6;

fn close_enough(a: f64, b: f64) -> bool {
    (a - b).abs() <= CATEGORY_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Collects per-year rows into parallel series.
///
/// Every row is checked before it is accepted: categories must sum to the
/// row's expense total, net worth must equal assets less liabilities, and the
/// cash reserve must never be negative. Series are never padded; a length
/// mismatch is reported rather than repaired.
pub fn assemble(rows: Vec<YearRow>, expected_len: usize) -> Result<ProjectionResult, ConsistencyError> {
    if rows.len() != expected_len {
        return Err(ConsistencyError::RowCount {
            expected: expected_len,
            actual: rows.len(),
        });
    }

    let mut result = ProjectionResult::default();
    for (year, row) in rows.into_iter().enumerate() {
        let category_sum = row.categories.total();
        if !close_enough(category_sum, row.expenses) {
            return Err(ConsistencyError::CategorySum {
                year,
                category_sum,
                total: row.expenses,
            });
        }
        if !close_enough(row.net_worth, row.assets - row.liabilities) {
            return Err(ConsistencyError::NetWorthIdentity {
                year,
                net_worth: row.net_worth,
                assets: row.assets,
                liabilities: row.liabilities,
            });
        }
        if row.savings_value < 0.0 {
            return Err(ConsistencyError::NegativeReserve {
                year,
                value: row.savings_value,
            });
        }
        push_row(&mut result, row);
    }

    check_lengths(&result, expected_len)?;
    Ok(result)
}

fn push_row(result: &mut ProjectionResult, row: YearRow) {
    result.ages.push(row.age);
    result.net_worth.push(row.net_worth);
    result.income.push(row.income);
    result.expenses.push(row.expenses);
    result.assets.push(row.assets);
    result.liabilities.push(row.liabilities);
    result.cash_flow.push(row.cash_flow);
    for category in ExpenseCategory::ALL {
        result
            .categories
            .series_mut(category)
            .push(row.categories.get(category));
    }
    result.payroll_tax.push(row.payroll_tax);
    result.federal_tax.push(row.federal_tax);
    result.state_tax.push(row.state_tax);
    result.effective_tax_rate.push(row.effective_tax_rate);
    result.marginal_tax_rate.push(row.marginal_tax_rate);
    result.retirement_contribution.push(row.retirement_contribution);
    result.debt_service.push(row.debt_service);
    result.home_value.push(row.home_value);
    result.mortgage.push(row.mortgage);
    result.car_value.push(row.car_value);
    result.car_loan.push(row.car_loan);
    result.student_loan.push(row.student_loan);
    result.personal_loans.push(row.personal_loans);
    result.savings_value.push(row.savings_value);
    result.other_assets_value.push(row.other_assets_value);
    result.retirement_value.push(row.retirement_value);
}

fn check_lengths(result: &ProjectionResult, expected: usize) -> Result<(), ConsistencyError> {
    let mut lengths: Vec<(&'static str, usize)> = vec![
        ("ages", result.ages.len()),
        ("netWorth", result.net_worth.len()),
        ("income", result.income.len()),
        ("expenses", result.expenses.len()),
        ("assets", result.assets.len()),
        ("liabilities", result.liabilities.len()),
        ("cashFlow", result.cash_flow.len()),
        ("payrollTax", result.payroll_tax.len()),
        ("federalTax", result.federal_tax.len()),
        ("stateTax", result.state_tax.len()),
        ("effectiveTaxRate", result.effective_tax_rate.len()),
        ("marginalTaxRate", result.marginal_tax_rate.len()),
        ("retirementContribution", result.retirement_contribution.len()),
        ("debtService", result.debt_service.len()),
        ("homeValue", result.home_value.len()),
        ("mortgage", result.mortgage.len()),
        ("carValue", result.car_value.len()),
        ("carLoan", result.car_loan.len()),
        ("studentLoan", result.student_loan.len()),
        ("personalLoans", result.personal_loans.len()),
        ("savingsValue", result.savings_value.len()),
        ("otherAssetsValue", result.other_assets_value.len()),
        ("retirementValue", result.retirement_value.len()),
    ];
    lengths.extend(
        ExpenseCategory::ALL
            .iter()
            .map(|category| (category.as_str(), result.categories.series(*category).len())),
    );

    match lengths.into_iter().find(|(_, len)| *len != expected) {
        Some((series, actual)) => Err(ConsistencyError::SeriesLength {
            series,
            expected,
            actual,
        }),
        None => Ok(()),
    }
}
