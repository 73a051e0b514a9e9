use crate::query::normalize::TimeRange;
use crate::query::service::{FunnelReport, FunnelStage};
use crate::query::sql_timestamp;
use duckdb::Connection;

/// Commerce funnel stages in conversion order. Stage names match the
/// `event_name` values produced by storefront trackers.
pub const FUNNEL_STAGES: [&str; 4] = ["product_view", "add_to_cart", "checkout_start", "purchase"];

/// Counts distinct visitors per funnel stage inside `[from, to)` and derives
/// conversion rates relative to the first stage.
pub fn query_funnel_report(
    conn: &Connection,
    range: &TimeRange,
) -> Result<FunnelReport, duckdb::Error> {
    // Note: stage names are application-defined constants, not user input.
    // User-provided values (the time bounds) are parameterized.
    let stage_counts = FUNNEL_STAGES
        .iter()
        .map(|stage| format!("COUNT(DISTINCT visitor_id) FILTER (WHERE event_name = '{stage}')"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT {stage_counts}
         FROM events
         WHERE timestamp >= CAST(? AS TIMESTAMP) AND timestamp < CAST(? AS TIMESTAMP)"
    );

    let mut stmt = conn.prepare(&sql)?;
    let visitors_per_stage: Vec<u64> = stmt.query_row(
        duckdb::params![sql_timestamp(&range.from), sql_timestamp(&range.to)],
        |row| {
            let mut counts = Vec::with_capacity(FUNNEL_STAGES.len());
            for idx in 0..FUNNEL_STAGES.len() {
                counts.push(row.get(idx)?);
            }
            Ok(counts)
        },
    )?;

    let entered = visitors_per_stage.first().copied().unwrap_or(0);
    let completed = visitors_per_stage.last().copied().unwrap_or(0);

    let stages = FUNNEL_STAGES
        .iter()
        .zip(&visitors_per_stage)
        .map(|(stage, &visitors)| FunnelStage {
            stage: (*stage).to_string(),
            visitors,
            conversion_rate: stage_rate(visitors, entered),
        })
        .collect();

    Ok(FunnelReport {
        from: range.from,
        to: range.to,
        stages,
        overall_conversion_rate: stage_rate(completed, entered),
    })
}

fn stage_rate(visitors: u64, entered: u64) -> f64 {
    if entered == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = visitors as f64 / entered as f64;
    rate
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

    fn insert_event(conn: &Connection, visitor_id: &str, event_name: &str, timestamp: &str) {
        conn.execute(
            "INSERT INTO events (event_id, visitor_id, timestamp, event_name, product_id)
             VALUES (?, ?, CAST(? AS TIMESTAMP), ?, 'sku-1')",
            duckdb::params![
                uuid::Uuid::new_v4().to_string(),
                visitor_id,
                timestamp,
                event_name
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
    fn test_funnel_counts_distinct_visitors_per_stage() {
        let conn = setup_test_db();
        insert_event(&conn, "v1", "product_view", "2024-01-02 10:00:00");
        insert_event(&conn, "v1", "add_to_cart", "2024-01-02 10:01:00");
        insert_event(&conn, "v1", "checkout_start", "2024-01-02 10:02:00");
        insert_event(&conn, "v1", "purchase", "2024-01-02 10:03:00");
        insert_event(&conn, "v2", "product_view", "2024-01-03 09:00:00");
        insert_event(&conn, "v2", "add_to_cart", "2024-01-03 09:05:00");
        insert_event(&conn, "v3", "product_view", "2024-01-04 16:00:00");

        let report = query_funnel_report(&conn, &january()).unwrap();

        assert_eq!(report.stages.len(), 4);
        assert_eq!(report.stages[0].stage, "product_view");
        assert_eq!(report.stages[0].visitors, 3);
        assert_eq!(report.stages[1].visitors, 2);
        assert_eq!(report.stages[2].visitors, 1);
        assert_eq!(report.stages[3].visitors, 1);
        assert!((report.stages[0].conversion_rate - 1.0).abs() < f64::EPSILON);
        assert!((report.stages[1].conversion_rate - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!((report.overall_conversion_rate - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_funnel_repeat_events_count_once() {
        let conn = setup_test_db();
        insert_event(&conn, "v1", "product_view", "2024-01-02 10:00:00");
        insert_event(&conn, "v1", "product_view", "2024-01-05 11:00:00");
        insert_event(&conn, "v1", "product_view", "2024-01-09 12:00:00");

        let report = query_funnel_report(&conn, &january()).unwrap();

        assert_eq!(report.stages[0].visitors, 1);
    }

    #[test]
    fn test_funnel_range_is_half_open() {
        let conn = setup_test_db();
        insert_event(&conn, "v1", "product_view", "2024-01-01 00:00:00");
        insert_event(&conn, "v2", "product_view", "2024-02-01 00:00:00");
        insert_event(&conn, "v3", "product_view", "2023-12-31 23:59:59");

        let report = query_funnel_report(&conn, &january()).unwrap();

        assert_eq!(report.stages[0].visitors, 1);
    }

    #[test]
    fn test_funnel_empty_range_reports_zeroes() {
        let conn = setup_test_db();

        let report = query_funnel_report(&conn, &january()).unwrap();

        assert_eq!(report.stages.len(), 4);
        for stage in &report.stages {
            assert_eq!(stage.visitors, 0);
            assert!(stage.conversion_rate.abs() < f64::EPSILON);
        }
        assert!(report.overall_conversion_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_funnel_echoes_range() {
        let conn = setup_test_db();
        let range = january();

        let report = query_funnel_report(&conn, &range).unwrap();

        assert_eq!(report.from, range.from);
        assert_eq!(report.to, range.to);
    }
}
