//! Monthly summary aggregation.
//!
//! [`summarize`] is a pure function over already-loaded rows: it performs no I/O and its output
//! depends only on its inputs, which keeps the rankings reproducible. Money values are rounded
//! to cents and percentages to two decimals.

use crate::analysis::period::MonthPeriod;
use crate::config::AnalysisConfig;
use crate::db::models::{goals::GoalDBResponse, investments::InvestmentDBResponse, transactions::TransactionDBResponse};
use crate::types::{CategoryId, EntryKind};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Aggregated figures for one month, stored alongside the generated narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlySummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub days_in_month: u32,
    pub transaction_count: usize,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub total_investment: Decimal,
    /// `total_income - total_expense`
    pub balance: Decimal,
    pub weekly_average_income: Decimal,
    pub weekly_average_expense: Decimal,
    pub daily_average_income: Decimal,
    pub daily_average_expense: Decimal,
    pub top_income_categories: Vec<CategoryTotal>,
    pub top_expense_categories: Vec<CategoryTotal>,
    pub outliers: Vec<Outlier>,
    pub goals: Vec<GoalProgress>,
    pub investment_diversification: Vec<InvestmentShare>,
    pub total_invested: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
    pub transaction_count: usize,
    /// Share of the kind's total, in percent
    pub percentage: Decimal,
}

/// An unusually large expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Outlier {
    pub description: String,
    pub category: String,
    pub amount: Decimal,
    pub occurred_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GoalProgress {
    pub name: String,
    pub target: Decimal,
    pub progress: Decimal,
    pub percentage: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InvestmentShare {
    pub category: String,
    pub total: Decimal,
    pub percentage: Decimal,
}

impl MonthlySummary {
    /// A summary of a month with no activity.
    pub fn empty(period: MonthPeriod) -> Self {
        Self {
            period_start: period.first_day(),
            period_end: period.last_day(),
            days_in_month: period.days(),
            transaction_count: 0,
            total_income: Decimal::ZERO,
            total_expense: Decimal::ZERO,
            total_investment: Decimal::ZERO,
            balance: Decimal::ZERO,
            weekly_average_income: Decimal::ZERO,
            weekly_average_expense: Decimal::ZERO,
            daily_average_income: Decimal::ZERO,
            daily_average_expense: Decimal::ZERO,
            top_income_categories: Vec::new(),
            top_expense_categories: Vec::new(),
            outliers: Vec::new(),
            goals: Vec::new(),
            investment_diversification: Vec::new(),
            total_invested: Decimal::ZERO,
        }
    }
}

fn round(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// `numerator / denominator`, or zero when the denominator is zero.
fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    round(ratio(part * HUNDRED, whole))
}

/// Build the summary for `period`. Transactions outside the period are ignored; goals and
/// investments are taken as they currently stand.
pub fn summarize(
    period: MonthPeriod,
    transactions: &[TransactionDBResponse],
    goals: &[GoalDBResponse],
    investments: &[InvestmentDBResponse],
    settings: &AnalysisConfig,
) -> MonthlySummary {
    let in_period: Vec<&TransactionDBResponse> =
        transactions.iter().filter(|t| period.contains(t.occurred_on)).collect();

    let total_of = |kind: EntryKind| -> Decimal {
        in_period.iter().filter(|t| t.kind == kind).map(|t| t.amount).sum()
    };
    let total_income = total_of(EntryKind::Income);
    let total_expense = total_of(EntryKind::Expense);
    let total_investment = total_of(EntryKind::Investment);

    let days = Decimal::from(period.days());
    let total_invested: Decimal = investments.iter().map(|i| i.amount).sum();

    MonthlySummary {
        period_start: period.first_day(),
        period_end: period.last_day(),
        days_in_month: period.days(),
        transaction_count: in_period.len(),
        total_income: round(total_income),
        total_expense: round(total_expense),
        total_investment: round(total_investment),
        balance: round(total_income - total_expense),
        weekly_average_income: round(ratio(total_income, settings.weekly_divisor)),
        weekly_average_expense: round(ratio(total_expense, settings.weekly_divisor)),
        daily_average_income: round(ratio(total_income, days)),
        daily_average_expense: round(ratio(total_expense, days)),
        top_income_categories: top_categories(&in_period, EntryKind::Income, settings.top_income_categories),
        top_expense_categories: top_categories(&in_period, EntryKind::Expense, settings.top_expense_categories),
        outliers: outliers(&in_period, settings.outlier_factor, settings.max_outliers),
        goals: goals.iter().map(goal_progress).collect(),
        investment_diversification: diversification(investments, total_invested),
        total_invested: round(total_invested),
    }
}

/// Sum per category of `kind`, largest first. Equal totals keep first-appearance order.
fn top_categories(transactions: &[&TransactionDBResponse], kind: EntryKind, limit: usize) -> Vec<CategoryTotal> {
    let mut groups: Vec<(CategoryId, CategoryTotal)> = Vec::new();
    let mut kind_total = Decimal::ZERO;

    for t in transactions.iter().filter(|t| t.kind == kind) {
        kind_total += t.amount;
        match groups.iter_mut().find(|(id, _)| *id == t.category_id) {
            Some((_, group)) => {
                group.total += t.amount;
                group.transaction_count += 1;
            }
            None => groups.push((
                t.category_id,
                CategoryTotal {
                    category: t.category_name.clone(),
                    total: t.amount,
                    transaction_count: 1,
                    percentage: Decimal::ZERO,
                },
            )),
        }
    }

    // sort_by is stable
    groups.sort_by(|(_, a), (_, b)| b.total.cmp(&a.total));
    groups
        .into_iter()
        .take(limit)
        .map(|(_, mut group)| {
            group.percentage = percentage(group.total, kind_total);
            group.total = round(group.total);
            group
        })
        .collect()
}

fn outliers(transactions: &[&TransactionDBResponse], factor: Decimal, limit: usize) -> Vec<Outlier> {
    let expenses: Vec<&&TransactionDBResponse> = transactions.iter().filter(|t| t.kind == EntryKind::Expense).collect();
    if expenses.is_empty() {
        return Vec::new();
    }

    let total: Decimal = expenses.iter().map(|t| t.amount).sum();
    let threshold = ratio(total, Decimal::from(expenses.len())) * factor;

    let mut flagged: Vec<&&TransactionDBResponse> = expenses.into_iter().filter(|t| t.amount > threshold).collect();
    flagged.sort_by(|a, b| b.amount.cmp(&a.amount));
    flagged
        .into_iter()
        .take(limit)
        .map(|t| Outlier {
            description: t.description.clone(),
            category: t.category_name.clone(),
            amount: round(t.amount),
            occurred_on: t.occurred_on,
        })
        .collect()
}

fn goal_progress(goal: &GoalDBResponse) -> GoalProgress {
    GoalProgress {
        name: goal.name.clone(),
        target: round(goal.target_amount),
        progress: round(goal.progress),
        percentage: percentage(goal.progress, goal.target_amount),
        remaining: round((goal.target_amount - goal.progress).max(Decimal::ZERO)),
    }
}

fn diversification(investments: &[InvestmentDBResponse], total: Decimal) -> Vec<InvestmentShare> {
    let mut shares: Vec<InvestmentShare> = Vec::new();
    for investment in investments {
        match shares.iter_mut().find(|s| s.category == investment.category) {
            Some(share) => share.total += investment.amount,
            None => shares.push(InvestmentShare {
                category: investment.category.clone(),
                total: investment.amount,
                percentage: Decimal::ZERO,
            }),
        }
    }

    shares.sort_by(|a, b| b.total.cmp(&a.total));
    for share in &mut shares {
        share.percentage = percentage(share.total, total);
        share.total = round(share.total);
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::str::FromStr;
    use uuid::Uuid;

    struct Fixture {
        user_id: Uuid,
        categories: Vec<(String, CategoryId)>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                user_id: Uuid::new_v4(),
                categories: Vec::new(),
            }
        }

        fn category_id(&mut self, name: &str) -> CategoryId {
            if let Some((_, id)) = self.categories.iter().find(|(n, _)| n == name) {
                return *id;
            }
            let id = Uuid::new_v4();
            self.categories.push((name.to_string(), id));
            id
        }

        fn tx(&mut self, kind: EntryKind, category: &str, amount: &str, day: u32) -> TransactionDBResponse {
            TransactionDBResponse {
                id: Uuid::new_v4(),
                user_id: self.user_id,
                category_id: self.category_id(category),
                category_name: category.to_string(),
                kind,
                amount: Decimal::from_str(amount).unwrap(),
                description: format!("{category} #{day}"),
                occurred_on: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        }
    }

    fn march() -> MonthPeriod {
        MonthPeriod::parse("2025-03").unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn goal(name: &str, target: &str, progress: &str) -> GoalDBResponse {
        GoalDBResponse {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: name.to_string(),
            target_amount: dec(target),
            progress: dec(progress),
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn investment(category: &str, amount: &str) -> InvestmentDBResponse {
        InvestmentDBResponse {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            goal_id: None,
            name: category.to_string(),
            amount: dec(amount),
            category: category.to_string(),
            invested_on: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_and_balance() {
        let mut f = Fixture::new();
        let transactions = vec![
            f.tx(EntryKind::Income, "Salary", "500", 1),
            f.tx(EntryKind::Expense, "Food", "200", 2),
            f.tx(EntryKind::Expense, "Food", "50", 3),
        ];

        let summary = summarize(march(), &transactions, &[], &[], &AnalysisConfig::default());
        assert_eq!(summary.total_income, dec("500"));
        assert_eq!(summary.total_expense, dec("250"));
        assert_eq!(summary.balance, dec("250"));
        assert_eq!(summary.transaction_count, 3);
    }

    #[test]
    fn test_averages_use_weekly_divisor_and_month_length() {
        let mut f = Fixture::new();
        let transactions = vec![f.tx(EntryKind::Expense, "Rent", "430", 1), f.tx(EntryKind::Income, "Salary", "310", 1)];

        let summary = summarize(march(), &transactions, &[], &[], &AnalysisConfig::default());
        assert_eq!(summary.weekly_average_expense, dec("100"));
        assert_eq!(summary.daily_average_expense, dec("13.87"));
        assert_eq!(summary.daily_average_income, dec("10"));
        assert_eq!(summary.days_in_month, 31);
    }

    #[test]
    fn test_top_expense_ranking_is_deterministic() {
        let mut f = Fixture::new();
        let transactions = vec![
            f.tx(EntryKind::Expense, "Transport", "100", 1),
            f.tx(EntryKind::Expense, "Food", "60", 2),
            f.tx(EntryKind::Expense, "Leisure", "100", 3),
            f.tx(EntryKind::Expense, "Food", "40", 4),
            f.tx(EntryKind::Expense, "Health", "10", 5),
            f.tx(EntryKind::Expense, "Pets", "20", 6),
            f.tx(EntryKind::Expense, "Gifts", "5", 7),
        ];

        let config = AnalysisConfig::default();
        let first = summarize(march(), &transactions, &[], &[], &config);
        for _ in 0..5 {
            assert_eq!(summarize(march(), &transactions, &[], &[], &config), first);
        }

        let names: Vec<&str> = first.top_expense_categories.iter().map(|c| c.category.as_str()).collect();
        // Ties keep first-appearance order
        assert_eq!(names, vec!["Transport", "Food", "Leisure", "Pets", "Health"]);
        assert_eq!(first.top_expense_categories[1].transaction_count, 2);
        assert_eq!(first.top_expense_categories[0].percentage, dec("29.85"));
    }

    #[test]
    fn test_top_income_is_capped_at_three() {
        let mut f = Fixture::new();
        let transactions: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, name)| f.tx(EntryKind::Income, name, &format!("{}", (i + 1) * 100), 1))
            .collect();

        let summary = summarize(march(), &transactions, &[], &[], &AnalysisConfig::default());
        let names: Vec<&str> = summary.top_income_categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["D", "C", "B"]);
        assert_eq!(summary.top_income_categories[0].percentage, dec("40"));
    }

    #[test]
    fn test_outliers_exceed_twice_the_mean() {
        let mut f = Fixture::new();
        let mut transactions: Vec<_> = (1..=10).map(|day| f.tx(EntryKind::Expense, "Food", "10", day)).collect();
        transactions.push(f.tx(EntryKind::Expense, "Travel", "300", 11));
        transactions.push(f.tx(EntryKind::Expense, "Repairs", "120", 12));
        transactions.push(f.tx(EntryKind::Expense, "Gadgets", "200", 13));
        transactions.push(f.tx(EntryKind::Expense, "Medical", "150", 14));
        // mean = 870 / 14 ~ 62.14, threshold ~ 124.29
        let summary = summarize(march(), &transactions, &[], &[], &AnalysisConfig::default());
        let amounts: Vec<Decimal> = summary.outliers.iter().map(|o| o.amount).collect();
        assert_eq!(amounts, vec![dec("300"), dec("200"), dec("150")]);
        assert_eq!(summary.outliers[0].category, "Travel");
    }

    #[test]
    fn test_transactions_outside_period_are_ignored() {
        let mut f = Fixture::new();
        let mut april = f.tx(EntryKind::Income, "Salary", "1000", 1);
        april.occurred_on = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let transactions = vec![april, f.tx(EntryKind::Income, "Salary", "10", 31)];

        let summary = summarize(march(), &transactions, &[], &[], &AnalysisConfig::default());
        assert_eq!(summary.total_income, dec("10"));
        assert_eq!(summary.transaction_count, 1);
    }

    #[test]
    fn test_goals_and_diversification() {
        let goals = vec![goal("House", "1000", "250"), goal("Overfunded", "100", "150")];
        let investments = vec![
            investment("Stocks", "300"),
            investment("Bonds", "100"),
            investment("Stocks", "100"),
        ];

        let summary = summarize(march(), &[], &goals, &investments, &AnalysisConfig::default());
        assert_eq!(summary.goals[0].percentage, dec("25"));
        assert_eq!(summary.goals[0].remaining, dec("750"));
        assert_eq!(summary.goals[1].percentage, dec("150"));
        assert_eq!(summary.goals[1].remaining, Decimal::ZERO);

        assert_eq!(summary.total_invested, dec("500"));
        assert_eq!(summary.investment_diversification.len(), 2);
        assert_eq!(summary.investment_diversification[0].category, "Stocks");
        assert_eq!(summary.investment_diversification[0].percentage, dec("80"));
        assert_eq!(summary.investment_diversification[1].percentage, dec("20"));
    }

    #[test]
    fn test_empty_month_has_zero_figures() {
        let summary = summarize(march(), &[], &[], &[], &AnalysisConfig::default());
        assert_eq!(summary, MonthlySummary::empty(march()));
    }
}
