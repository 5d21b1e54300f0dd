use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    dto::finance::{FinanceQuery, FinanceSummary, MonthlyRevenue, RevenueRow, RevenueSource},
    error::{AppError, AppResult},
    middleware::auth::Session,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn summary(
    state: &AppState,
    session: &Session,
    query: FinanceQuery,
) -> AppResult<ApiResponse<FinanceSummary>> {
    session.require_admin()?;

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from >= to {
            return Err(AppError::Validation("to: must be after from".into()));
        }
    }
    let from = query.from.map(start_of_day);
    let to = query.to.map(start_of_day);

    let raw: Vec<(String, String, Decimal, i64, i64)> = sqlx::query_as(
        r#"
        SELECT to_char(date_trunc('month', fulfilled_at), 'YYYY-MM') AS month,
               'order'::TEXT AS source,
               COALESCE(SUM(price_paid), 0) AS revenue,
               COALESCE(SUM(quantity), 0)::BIGINT AS units,
               COUNT(*)::BIGINT AS sales
        FROM orders
        WHERE status = 'fulfilled'
          AND fulfilled_at IS NOT NULL
          AND ($1::timestamptz IS NULL OR fulfilled_at >= $1)
          AND ($2::timestamptz IS NULL OR fulfilled_at < $2)
        GROUP BY 1
        UNION ALL
        SELECT to_char(date_trunc('month', created_at), 'YYYY-MM') AS month,
               CASE WHEN product_id IS NOT NULL THEN 'product_walk_in' ELSE 'service_walk_in' END::TEXT AS source,
               COALESCE(SUM(price_paid), 0) AS revenue,
               COALESCE(SUM(quantity), 0)::BIGINT AS units,
               COUNT(*)::BIGINT AS sales
        FROM walk_ins
        WHERE ($1::timestamptz IS NULL OR created_at >= $1)
          AND ($2::timestamptz IS NULL OR created_at < $2)
        GROUP BY 1, 2
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(&state.pool)
    .await?;

    let (pending_orders,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)::BIGINT FROM orders
        WHERE status = 'pending'
          AND ($1::timestamptz IS NULL OR created_at >= $1)
          AND ($2::timestamptz IS NULL OR created_at < $2)
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_one(&state.pool)
    .await?;

    let rows = raw
        .into_iter()
        .map(|(month, source, revenue, units, sales)| {
            let source = match source.as_str() {
                "order" => RevenueSource::Order,
                "product_walk_in" => RevenueSource::ProductWalkIn,
                "service_walk_in" => RevenueSource::ServiceWalkIn,
                other => {
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "unknown revenue source {other}"
                    )));
                }
            };
            Ok(RevenueRow {
                month,
                source,
                revenue,
                units,
                sales,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Finance summary",
        summarize(&rows, pending_orders),
        Some(Meta::empty()),
    ))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Fold per-month, per-source buckets into the dashboard totals.
pub fn summarize(rows: &[RevenueRow], pending_orders: i64) -> FinanceSummary {
    let mut order_revenue = Decimal::ZERO;
    let mut product_walk_in_revenue = Decimal::ZERO;
    let mut service_walk_in_revenue = Decimal::ZERO;
    let mut fulfilled_orders = 0;
    let mut walk_ins = 0;
    let mut units_sold = 0;
    let mut months: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();

    for row in rows {
        let month = months
            .entry(row.month.as_str())
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        match row.source {
            RevenueSource::Order => {
                order_revenue += row.revenue;
                fulfilled_orders += row.sales;
                units_sold += row.units;
                month.0 += row.revenue;
            }
            RevenueSource::ProductWalkIn => {
                product_walk_in_revenue += row.revenue;
                walk_ins += row.sales;
                units_sold += row.units;
                month.1 += row.revenue;
            }
            RevenueSource::ServiceWalkIn => {
                service_walk_in_revenue += row.revenue;
                walk_ins += row.sales;
                month.1 += row.revenue;
            }
        }
    }

    let walk_in_revenue = product_walk_in_revenue + service_walk_in_revenue;
    let monthly = months
        .into_iter()
        .map(|(month, (orders, walk_ins))| MonthlyRevenue {
            month: month.to_string(),
            orders,
            walk_ins,
            total: orders + walk_ins,
        })
        .collect();

    FinanceSummary {
        order_revenue,
        walk_in_revenue,
        product_walk_in_revenue,
        service_walk_in_revenue,
        total_revenue: order_revenue + walk_in_revenue,
        fulfilled_orders,
        pending_orders,
        walk_ins,
        units_sold,
        monthly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: &str, source: RevenueSource, revenue: i64, units: i64, sales: i64) -> RevenueRow {
        RevenueRow {
            month: month.into(),
            source,
            revenue: Decimal::new(revenue, 2),
            units,
            sales,
        }
    }

    #[test]
    fn empty_window_is_all_zero() {
        let summary = summarize(&[], 3);
        assert_eq!(summary.total_revenue, Decimal::ZERO);
        assert_eq!(summary.pending_orders, 3);
        assert!(summary.monthly.is_empty());
    }

    #[test]
    fn totals_split_by_source_and_month() {
        let rows = vec![
            row("2026-02", RevenueSource::ServiceWalkIn, 1500, 1, 1),
            row("2026-01", RevenueSource::Order, 3000, 3, 1),
            row("2026-01", RevenueSource::ProductWalkIn, 2000, 2, 1),
            row("2026-02", RevenueSource::Order, 4550, 5, 2),
        ];
        let summary = summarize(&rows, 0);

        assert_eq!(summary.order_revenue, Decimal::new(7550, 2));
        assert_eq!(summary.product_walk_in_revenue, Decimal::new(2000, 2));
        assert_eq!(summary.service_walk_in_revenue, Decimal::new(1500, 2));
        assert_eq!(summary.walk_in_revenue, Decimal::new(3500, 2));
        assert_eq!(summary.total_revenue, Decimal::new(11050, 2));
        assert_eq!(summary.fulfilled_orders, 3);
        assert_eq!(summary.walk_ins, 2);
        // service quantities are not stock units
        assert_eq!(summary.units_sold, 10);

        let months: Vec<&str> = summary.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2026-01", "2026-02"]);
        assert_eq!(summary.monthly[0].total, Decimal::new(5000, 2));
        assert_eq!(summary.monthly[1].orders, Decimal::new(4550, 2));
        assert_eq!(summary.monthly[1].walk_ins, Decimal::new(1500, 2));
    }
}
