use chrono::NaiveDateTime;
use duckdb::Connection;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single commerce event ready for storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceEvent {
    pub event_id: String,
    pub visitor_id: String,
    pub timestamp: NaiveDateTime,
    pub event_name: String,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<u32>,
    pub revenue_amount: Option<f64>,
    pub revenue_currency: Option<String>,
}

/// Thread-safe event buffer that accumulates events and flushes to DuckDB
/// when the count threshold is reached.
pub struct EventBuffer {
    events: Mutex<Vec<CommerceEvent>>,
    flush_threshold: usize,
    conn: Arc<Mutex<Connection>>,
}

impl EventBuffer {
    pub fn new(flush_threshold: usize, conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            events: Mutex::new(Vec::with_capacity(flush_threshold)),
            flush_threshold,
            conn,
        }
    }

    /// Returns a reference to the DuckDB connection for query access.
    pub const fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    /// Add an event to the buffer. If the buffer reaches the threshold,
    /// automatically flushes to DuckDB.
    pub fn push(&self, event: CommerceEvent) -> Result<Option<usize>, BufferError> {
        let should_flush;
        {
            let mut events = self.events.lock();
            events.push(event);
            should_flush = events.len() >= self.flush_threshold;
        }

        if should_flush {
            let flushed = self.flush()?;
            Ok(Some(flushed))
        } else {
            Ok(None)
        }
    }

    /// Returns the current number of buffered events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Flush all buffered events into the DuckDB events table.
    pub fn flush(&self) -> Result<usize, BufferError> {
        let events: Vec<CommerceEvent> = {
            let mut buf = self.events.lock();
            std::mem::take(&mut *buf)
        };

        if events.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock();
        for event in &events {
            conn.execute(
                "INSERT INTO events (event_id, visitor_id, timestamp, event_name, product_id,
                 product_name, quantity, revenue_amount, revenue_currency)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                duckdb::params![
                    event.event_id,
                    event.visitor_id,
                    event.timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
                    event.event_name,
                    event.product_id,
                    event.product_name,
                    event.quantity,
                    event.revenue_amount,
                    event.revenue_currency,
                ],
            )
            .map_err(BufferError::Insert)?;
        }
        drop(conn);

        let count = events.len();
        tracing::debug!(count, "Flushed events to storage");
        Ok(count)
    }
}

#[derive(Debug)]
pub enum BufferError {
    Insert(duckdb::Error),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert(e) => write!(f, "Insert error: {e}"),
        }
    }
}

impl std::error::Error for BufferError {}
