//! Contact store operations: batch insert with dedup lookups, phone
//! lookup for inbound matching, idempotent status updates.

use async_trait::async_trait;
use sqlx::Row as _;

use crate::error::{Error, Result};
use crate::model::{Contact, ContactId, ContactStatus, NewContact};
use crate::store::ContactStore;

#[async_trait]
impl ContactStore for super::Db {
    async fn email_exists(&self, email: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM contacts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Batch insert inside a single transaction — any row failure rolls
    /// back the whole batch, so no partial inserts are ever visible.
    async fn insert_batch(&self, contacts: &[NewContact]) -> Result<Vec<ContactId>> {
        if contacts.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(contacts.len());

        for contact in contacts {
            let row = sqlx::query(
                "INSERT INTO contacts (name, email, phone, organization, custom_fields)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.organization)
            .bind(&contact.custom_fields)
            .fetch_one(&mut *tx)
            .await?;

            ids.push(ContactId(row.get::<i64, _>("id")));
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn get(&self, id: ContactId) -> Result<Contact> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, name, email, phone, organization, custom_fields, status, created_at, updated_at
             FROM contacts WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("contact {id}")))?
            .try_into_contact()
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(
            "SELECT id, name, email, phone, organization, custom_fields, status, created_at, updated_at
             FROM contacts WHERE phone = $1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContactRow::try_into_contact).transpose()
    }

    async fn list(&self, limit: i64) -> Result<Vec<Contact>> {
        let rows: Vec<ContactRow> = sqlx::query_as(
            "SELECT id, name, email, phone, organization, custom_fields, status, created_at, updated_at
             FROM contacts ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContactRow::try_into_contact).collect()
    }

    async fn update_status(&self, id: ContactId, status: ContactStatus) -> Result<()> {
        let rows_affected =
            sqlx::query("UPDATE contacts SET status = $1, updated_at = now() WHERE id = $2")
                .bind(status.to_string())
                .bind(id.0)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("contact {id}")));
        }
        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct ContactRow {
    id: i64,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    organization: Option<String>,
    custom_fields: serde_json::Value,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl ContactRow {
    fn try_into_contact(self) -> Result<Contact> {
        Ok(Contact {
            id: ContactId(self.id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            organization: self.organization,
            custom_fields: self.custom_fields,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
