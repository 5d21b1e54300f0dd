use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Half-open reporting window `[from, to)`; either end may be omitted.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FinanceQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    Order,
    ProductWalkIn,
    ServiceWalkIn,
}

/// One aggregated (month, source) bucket as read from the database.
#[derive(Debug, Clone)]
pub struct RevenueRow {
    pub month: String,
    pub source: RevenueSource,
    pub revenue: Decimal,
    pub units: i64,
    pub sales: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyRevenue {
    pub month: String,
    #[schema(value_type = String)]
    pub orders: Decimal,
    #[schema(value_type = String)]
    pub walk_ins: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FinanceSummary {
    #[schema(value_type = String)]
    pub order_revenue: Decimal,
    #[schema(value_type = String)]
    pub walk_in_revenue: Decimal,
    #[schema(value_type = String)]
    pub product_walk_in_revenue: Decimal,
    #[schema(value_type = String)]
    pub service_walk_in_revenue: Decimal,
    #[schema(value_type = String)]
    pub total_revenue: Decimal,
    pub fulfilled_orders: i64,
    pub pending_orders: i64,
    pub walk_ins: i64,
    /// Fulfilled order quantities plus product walk-in quantities.
    pub units_sold: i64,
    pub monthly: Vec<MonthlyRevenue>,
}
