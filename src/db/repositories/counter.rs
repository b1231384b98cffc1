use anyhow::{Context, Result};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

/// Per-day serial allocator behind permit-number assignment.
///
/// The increment is a single conditional upsert so that two approvals racing
/// within the same second still observe distinct serials; this replaces the
/// read-count-then-write sequence that could hand out duplicates.
pub struct CounterRepository {
    conn: DatabaseConnection,
}

impl CounterRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Allocates the next serial for `day` (key form `DDMMYYYY`), starting
    /// at 1 for the first approval of the day.
    pub async fn next_serial(&self, day: &str) -> Result<i32> {
        let backend = self.conn.get_database_backend();

        let row = self
            .conn
            .query_one(Statement::from_sql_and_values(
                backend,
                "INSERT INTO permit_counters (day, value) VALUES ($1, 1) \
                 ON CONFLICT(day) DO UPDATE SET value = value + 1 \
                 RETURNING value",
                [day.into()],
            ))
            .await
            .context("Failed to advance permit counter")?
            .ok_or_else(|| anyhow::anyhow!("Permit counter upsert returned no row"))?;

        let value: i32 = row
            .try_get("", "value")
            .context("Failed to read permit counter value")?;
        Ok(value)
    }
}
