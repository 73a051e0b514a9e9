use crate::query::normalize::TimeRange;
use crate::query::service::TopProductMetric;
use crate::query::sql_timestamp;
use duckdb::Connection;

/// Ranks products by revenue, then purchases, then views over `[from, to)`.
/// Events without a product id (session-level events) are ignored.
pub fn query_top_products(
    conn: &Connection,
    range: &TimeRange,
    limit: u32,
) -> Result<Vec<TopProductMetric>, duckdb::Error> {
    let mut stmt = conn.prepare(
        "SELECT product_id,
                MAX(product_name) AS product_name,
                COUNT(*) FILTER (WHERE event_name = 'product_view') AS views,
                COUNT(*) FILTER (WHERE event_name = 'purchase') AS purchases,
                CAST(COALESCE(SUM(quantity) FILTER (WHERE event_name = 'purchase'), 0) AS BIGINT) AS units_sold,
                CAST(COALESCE(SUM(revenue_amount) FILTER (WHERE event_name = 'purchase'), 0) AS DOUBLE) AS revenue
         FROM events
         WHERE product_id IS NOT NULL
           AND timestamp >= CAST(? AS TIMESTAMP)
           AND timestamp < CAST(? AS TIMESTAMP)
         GROUP BY product_id
         ORDER BY revenue DESC, purchases DESC, views DESC
         LIMIT ?",
    )?;

    let rows = stmt
        .query_map(
            duckdb::params![
                sql_timestamp(&range.from),
                sql_timestamp(&range.to),
                i64::from(limit)
            ],
            |row| {
                Ok(TopProductMetric {
                    product_id: row.get(0)?,
                    product_name: row.get(1)?,
                    views: row.get(2)?,
                    purchases: row.get(3)?,
                    units_sold: row.get(4)?,
                    revenue: row.get(5)?,
                })
            },
        )?
        .filter_map(Result::ok)
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::storage::schema::init_schema(&conn).unwrap();
        conn
    }

    fn insert_view(conn: &Connection, visitor_id: &str, product_id: &str, timestamp: &str) {
        conn.execute(
            "INSERT INTO events (event_id, visitor_id, timestamp, event_name, product_id)
             VALUES (?, ?, CAST(? AS TIMESTAMP), 'product_view', ?)",
            duckdb::params![
                uuid::Uuid::new_v4().to_string(),
                visitor_id,
                timestamp,
                product_id
            ],
        )
        .unwrap();
    }

    fn insert_purchase(
        conn: &Connection,
        product_id: &str,
        product_name: &str,
        quantity: i32,
        revenue: f64,
        timestamp: &str,
    ) {
        conn.execute(
            "INSERT INTO events (event_id, visitor_id, timestamp, event_name, product_id,
                                 product_name, quantity, revenue_amount, revenue_currency)
             VALUES (?, 'buyer', CAST(? AS TIMESTAMP), 'purchase', ?, ?, ?, ?, 'USD')",
            duckdb::params![
                uuid::Uuid::new_v4().to_string(),
                timestamp,
                product_id,
                product_name,
                quantity,
                revenue
            ],
        )
        .unwrap();
    }

    fn january() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_top_products_ranked_by_revenue() {
        let conn = setup_test_db();
        insert_purchase(&conn, "sku-a", "Desk Lamp", 1, 100.0, "2024-01-05 10:00:00");
        insert_purchase(&conn, "sku-a", "Desk Lamp", 1, 50.0, "2024-01-06 10:00:00");
        insert_purchase(&conn, "sku-b", "Monitor", 1, 200.0, "2024-01-07 10:00:00");
        insert_view(&conn, "v1", "sku-c", "2024-01-08 10:00:00");

        let products = query_top_products(&conn, &january(), 20).unwrap();

        assert_eq!(products.len(), 3);
        assert_eq!(products[0].product_id, "sku-b");
        assert_eq!(products[1].product_id, "sku-a");
        assert_eq!(products[2].product_id, "sku-c");
        assert!((products[0].revenue - 200.0).abs() < f64::EPSILON);
        assert!((products[1].revenue - 150.0).abs() < f64::EPSILON);
        assert!(products[2].revenue.abs() < f64::EPSILON);
    }

    #[test]
    fn test_top_products_aggregates_counts() {
        let conn = setup_test_db();
        insert_view(&conn, "v1", "sku-a", "2024-01-02 09:00:00");
        insert_view(&conn, "v2", "sku-a", "2024-01-02 09:30:00");
        insert_view(&conn, "v2", "sku-a", "2024-01-03 18:00:00");
        insert_purchase(&conn, "sku-a", "Desk Lamp", 2, 80.0, "2024-01-04 12:00:00");
        insert_purchase(&conn, "sku-a", "Desk Lamp", 1, 40.0, "2024-01-05 12:00:00");

        let products = query_top_products(&conn, &january(), 20).unwrap();

        assert_eq!(products.len(), 1);
        let metric = &products[0];
        assert_eq!(metric.product_name.as_deref(), Some("Desk Lamp"));
        assert_eq!(metric.views, 3);
        assert_eq!(metric.purchases, 2);
        assert_eq!(metric.units_sold, 3);
        assert!((metric.revenue - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_top_products_respects_limit() {
        let conn = setup_test_db();
        insert_purchase(&conn, "sku-a", "Desk Lamp", 1, 10.0, "2024-01-05 10:00:00");
        insert_purchase(&conn, "sku-b", "Monitor", 1, 20.0, "2024-01-05 11:00:00");
        insert_purchase(&conn, "sku-c", "Keyboard", 1, 30.0, "2024-01-05 12:00:00");

        let products = query_top_products(&conn, &january(), 2).unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].product_id, "sku-c");
        assert_eq!(products[1].product_id, "sku-b");
    }

    #[test]
    fn test_top_products_skips_events_without_product() {
        let conn = setup_test_db();
        conn.execute(
            "INSERT INTO events (event_id, visitor_id, timestamp, event_name)
             VALUES (?, 'v1', CAST('2024-01-05 10:00:00' AS TIMESTAMP), 'session_start')",
            duckdb::params![uuid::Uuid::new_v4().to_string()],
        )
        .unwrap();
        insert_view(&conn, "v1", "sku-a", "2024-01-05 10:01:00");

        let products = query_top_products(&conn, &january(), 20).unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_id, "sku-a");
    }

    #[test]
    fn test_top_products_range_excludes_outside_purchases() {
        let conn = setup_test_db();
        insert_purchase(&conn, "sku-a", "Desk Lamp", 1, 50.0, "2024-01-05 10:00:00");
        insert_purchase(&conn, "sku-a", "Desk Lamp", 1, 999.0, "2024-03-01 10:00:00");

        let products = query_top_products(&conn, &january(), 20).unwrap();

        assert_eq!(products.len(), 1);
        assert!((products[0].revenue - 50.0).abs() < f64::EPSILON);
        assert_eq!(products[0].purchases, 1);
    }
}
