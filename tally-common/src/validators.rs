use rust_decimal::Decimal;

use crate::period::Period;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(&'static str),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

pub fn validate_reset_day(period: Period, reset_day: i32) -> Validity {
    if period.reset_day_range().contains(&reset_day) {
        return Validity::Valid;
    }

    match period {
        Period::Monthly => Validity::Invalid("Monthly reset day must be between 1 and 31"),
        Period::Weekly => {
            Validity::Invalid("Weekly reset day must be between 0 (Sunday) and 6 (Saturday)")
        }
        Period::Yearly => Validity::Invalid("Yearly reset day must be between 1 and 366"),
    }
}

// Amounts are stored as NUMERIC(15,2)
const MAX_AMOUNT_SCALE: u32 = 2;
const MAX_AMOUNT_INTEGER_DIGITS: u32 = 13;

pub fn validate_amount(amount: Decimal) -> Validity {
    if amount <= Decimal::ZERO {
        return Validity::Invalid("Budget amount must be greater than zero");
    }

    if amount.normalize().scale() > MAX_AMOUNT_SCALE {
        return Validity::Invalid("Budget amount cannot have more than two decimal places");
    }

    if amount.trunc() >= Decimal::from(10i64.pow(MAX_AMOUNT_INTEGER_DIGITS)) {
        return Validity::Invalid(
            "Budget amount cannot have more than 13 digits before the decimal point",
        );
    }

    Validity::Valid
}

/// Checks everything a budget row has to satisfy, amount first.
pub fn validate_budget_terms(amount: Decimal, period: Period, reset_day: i32) -> Validity {
    match validate_amount(amount) {
        Validity::Valid => validate_reset_day(period, reset_day),
        invalid => invalid,
    }
}
