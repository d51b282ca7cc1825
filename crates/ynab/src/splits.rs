//! Turns receipt line items into YNAB sub-transactions.
//!
//! Sub-transactions must add up to the parent amount to the milliunit, while
//! receipts rarely do: prices may exclude taxes, discounts may be printed on
//! their own line, and every figure is a float. The split is built in three
//! steps:
//!
//! 1. line items are grouped per category, in first-seen order;
//! 2. when the taxes are not already part of the line item prices, they are
//!    spread over the groups proportionally to the group amounts;
//! 3. whatever is still missing to reach the total goes to the largest group.

use engine::SplitLine;

use crate::Milliunits;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryAmount {
    pub category: String,
    pub amount: Milliunits,
}

fn sum(groups: &[CategoryAmount]) -> Option<Milliunits> {
    groups
        .iter()
        .try_fold(Milliunits::ZERO, |acc, g| acc.checked_add(g.amount))
}

/// Spend per category. The amounts add up to `total`.
///
/// Returns `None` when an amount is not a finite number or the sums do not
/// fit in milliunits.
pub fn allocate(
    total: f64,
    lines: &[SplitLine],
    taxes: Option<f64>,
) -> Option<Vec<CategoryAmount>> {
    let total = Milliunits::from_amount(total)?;

    let mut groups: Vec<CategoryAmount> = Vec::new();
    for line in lines {
        let amount = Milliunits::from_amount(line.amount)?;
        match groups.iter_mut().find(|g| g.category == line.category) {
            Some(group) => group.amount = group.amount.checked_add(amount)?,
            None => groups.push(CategoryAmount {
                category: line.category.clone(),
                amount,
            }),
        }
    }
    if groups.is_empty() {
        return Some(groups);
    }

    let items = sum(&groups)?;
    let taxes = match taxes {
        Some(taxes) => Milliunits::from_amount(taxes)?,
        None => Milliunits::ZERO,
    };
    let gap_with_taxes = total.checked_sub(items.checked_add(taxes)?)?.checked_abs()?;
    let gap_without_taxes = total.checked_sub(items)?.checked_abs()?;
    if !taxes.is_zero() && gap_with_taxes < gap_without_taxes {
        for group in groups.iter_mut() {
            let share = taxes.share(group.amount, items)?;
            group.amount = group.amount.checked_add(share)?;
        }
    }

    let remainder = total.checked_sub(sum(&groups)?)?;
    if !remainder.is_zero() {
        let mut largest = 0;
        for (idx, group) in groups.iter().enumerate() {
            if group.amount > groups[largest].amount {
                largest = idx;
            }
        }
        groups[largest].amount = groups[largest].amount.checked_add(remainder)?;
    }

    Some(groups)
}
