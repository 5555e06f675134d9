//! Summary types and the per-project computation.

use serde::{Deserialize, Serialize};

use crate::paymo::Project;

/// Whether actual cost has stayed within the budgeted cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    #[serde(rename = "Within budget")]
    WithinBudget,
    #[serde(rename = "Over budget")]
    OverBudget,
}

impl BudgetStatus {
    pub fn from_costs(budgeted_cost: f64, actual_cost: f64) -> Self {
        if actual_cost <= budgeted_cost {
            BudgetStatus::WithinBudget
        } else {
            BudgetStatus::OverBudget
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BudgetStatus::WithinBudget => write!(f, "Within budget"),
            BudgetStatus::OverBudget => write!(f, "Over budget"),
        }
    }
}

/// How the budgeted hours were established.
///
/// - **Unset**: neither the project nor any task carries a budget.
/// - **Zero**: a budget was given but totals zero hours.
/// - **Set**: a non-zero budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetState {
    Unset,
    Zero,
    Set,
}

/// Derived budget performance for one project. Costs are unrounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub project_id: i64,
    pub name: String,
    pub total_logged_hours: f64,
    /// `None` when the budget totals zero hours; see `budget_state`.
    pub budgeted_hours: Option<f64>,
    pub budget_state: BudgetState,
    pub budgeted_cost: f64,
    pub actual_cost: f64,
    pub cost_variance: f64,
    /// `budgeted_cost / actual_cost`, or `None` when nothing has been spent.
    pub cost_performance_index: Option<f64>,
    pub status: BudgetStatus,
}

/// Resolve budgeted hours: the project's own `budget_hours` when non-zero,
/// otherwise the sum of task budgets (missing task budgets count as zero).
pub fn resolve_budget_hours(project: &Project) -> (f64, BudgetState) {
    let own = project.budget_hours.unwrap_or(0.0);
    let task_total: f64 = project
        .tasks
        .iter()
        .map(|t| t.budget_hours.unwrap_or(0.0))
        .sum();
    let hours = if own != 0.0 { own } else { task_total };

    let declared =
        project.budget_hours.is_some() || project.tasks.iter().any(|t| t.budget_hours.is_some());
    let state = if hours != 0.0 {
        BudgetState::Set
    } else if declared {
        BudgetState::Zero
    } else {
        BudgetState::Unset
    };
    (hours, state)
}

/// Logged hours from the report total, falling back to the project's
/// `recorded_time` when the report shows no time at all.
pub fn logged_hours(project: &Project, worked_seconds: f64) -> f64 {
    if worked_seconds == 0.0 {
        if let Some(recorded) = project.recorded_time.filter(|s| *s > 0.0) {
            return recorded / 3600.0;
        }
    }
    worked_seconds / 3600.0
}

/// Derive the performance summary for `project` given its worked seconds.
///
/// Flat-billed projects are budgeted at `price` (or `estimated_price`) and
/// accrue no hourly cost, so their actual cost is always zero.
pub fn compute_summary(project: &Project, worked_seconds: f64) -> PerformanceSummary {
    let total_logged_hours = logged_hours(project, worked_seconds);
    let (budget_hours, budget_state) = resolve_budget_hours(project);

    let (rate, budgeted_cost) = if project.is_flat_billing() {
        let fixed = project.price.or(project.estimated_price).unwrap_or(0.0);
        (0.0, fixed)
    } else {
        let rate = project.price_per_hour.unwrap_or(0.0);
        (rate, budget_hours * rate)
    };
    let actual_cost = total_logged_hours * rate;

    PerformanceSummary {
        project_id: project.id,
        name: project.name.clone(),
        total_logged_hours,
        budgeted_hours: (budget_hours != 0.0).then_some(budget_hours),
        budget_state,
        budgeted_cost,
        actual_cost,
        cost_variance: budgeted_cost - actual_cost,
        cost_performance_index: (actual_cost > 0.0).then(|| budgeted_cost / actual_cost),
        status: BudgetStatus::from_costs(budgeted_cost, actual_cost),
    }
}
