use duckdb::Connection;

/// SQL statement to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    event_id         VARCHAR NOT NULL,
    visitor_id       VARCHAR NOT NULL,
    timestamp        TIMESTAMP NOT NULL,
    event_name       VARCHAR NOT NULL,
    product_id       VARCHAR,
    product_name     VARCHAR,
    quantity         INTEGER,
    revenue_amount   DECIMAL(12,2),
    revenue_currency VARCHAR(3)
)
";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_EVENTS_TABLE)?;
    Ok(())
}
