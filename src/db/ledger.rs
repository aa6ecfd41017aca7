//! Outreach ledger operations. Inserts only — history rows are never
//! updated or deleted.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ContactId, NewRecord, OutreachRecord};
use crate::store::OutreachLedger;

#[async_trait]
impl OutreachLedger for super::Db {
    async fn append(&self, record: NewRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO outreach_history (contact_id, type, content, status)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(record.contact_id.0)
        .bind(record.record_type.to_string())
        .bind(&record.content)
        .bind(record.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history(&self, contact_id: ContactId) -> Result<Vec<OutreachRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT contact_id, type, content, status, created_at
             FROM outreach_history WHERE contact_id = $1 ORDER BY created_at",
        )
        .bind(contact_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RecordRow::try_into_record).collect()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct RecordRow {
    contact_id: i64,
    #[sqlx(rename = "type")]
    record_type: String,
    content: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl RecordRow {
    fn try_into_record(self) -> Result<OutreachRecord> {
        Ok(OutreachRecord {
            contact_id: ContactId(self.contact_id),
            record_type: self.record_type.parse()?,
            content: self.content,
            status: self.status.parse()?,
            timestamp: self.created_at,
        })
    }
}
