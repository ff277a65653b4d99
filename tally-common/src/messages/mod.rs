use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::models::budget_history::BudgetHistory;
use crate::models::category::Category;
use crate::period::Period;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewBudget {
    pub category_id: Uuid,
    pub amount: Decimal,
    pub period: Period,
    pub reset_day: i32,
}

/// Fields left out are kept as they are
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetUpdate {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub period: Option<Period>,
    #[serde(default)]
    pub reset_day: Option<i32>,
}

impl BudgetUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.period.is_none() && self.reset_day.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetWithSpending {
    pub budget: Budget,
    pub category_name: String,
    pub category_type: String,

    // Spent so far in the window that is still open
    pub current_spent: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetList {
    pub budgets: Vec<BudgetWithSpending>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetHistoryList {
    pub budget_id: Uuid,
    pub history: Vec<BudgetHistory>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CategoryList {
    pub categories: Vec<Category>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    IncorrectlyFormed,
    MissingHeader,
    ConflictWithExisting,
    BudgetDoesNotExist,
    CategoryDoesNotExist,
    StorageUnavailable,
    InternalError,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerErrorResponse {
    pub err_type: ErrorType,
    pub err_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_update_accepts_partial_fields() {
        let update: BudgetUpdate = serde_json::from_str(r#"{"amount": "250.00"}"#).unwrap();
        assert_eq!(update.amount, Some(Decimal::new(25000, 2)));
        assert!(update.period.is_none());
        assert!(update.reset_day.is_none());
        assert!(!update.is_empty());

        let update: BudgetUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_new_budget_rejects_unknown_period() {
        let body = r#"{
            "category_id": "0190a6b6-8f3a-7c4e-9a1b-2c3d4e5f6a7b",
            "amount": 100,
            "period": "daily",
            "reset_day": 1
        }"#;

        assert!(serde_json::from_str::<NewBudget>(body).is_err());
    }

    #[test]
    fn test_new_budget_parses() {
        let body = r#"{
            "category_id": "0190a6b6-8f3a-7c4e-9a1b-2c3d4e5f6a7b",
            "amount": "100.50",
            "period": "weekly",
            "reset_day": 3
        }"#;

        let new_budget = serde_json::from_str::<NewBudget>(body).unwrap();
        assert_eq!(new_budget.amount, Decimal::new(10050, 2));
        assert_eq!(new_budget.period, Period::Weekly);
        assert_eq!(new_budget.reset_day, 3);
    }
}
