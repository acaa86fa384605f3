//! libSQL backend — async `TicketStore` implementation.
//!
//! Supports local file and in-memory databases. Every email dispatch runs
//! in a single transaction so a failure never leaves half a ticket behind.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Row, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::inbound::types::{Attachment, InboundEmail};
use crate::store::migrations;
use crate::store::traits::{ReplyRef, TicketRef, TicketStore};

const STATUS_OPEN: &str = "open";
const SOURCE_EMAIL: &str = "email";

/// Which record an attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentOwner {
    Ticket,
    Reply,
}

impl AttachmentOwner {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Reply => "reply",
        }
    }
}

/// A reply row as persisted.
#[derive(Debug, Clone)]
pub struct StoredReply {
    pub id: String,
    pub ticket_id: String,
    pub customer_email: String,
    pub subject: String,
    pub body: String,
    pub message_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An attachment row as persisted.
#[derive(Debug, Clone)]
pub struct StoredAttachment {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub content: Vec<u8>,
}

/// libSQL ticket store.
///
/// Stores a single connection that is reused for all operations.
pub struct LibSqlTicketStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlTicketStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Ticket database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Replies on a ticket, oldest first.
    pub async fn replies_for_ticket(&self, ticket_id: &str) -> Result<Vec<StoredReply>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT r.id, r.ticket_id, c.email, r.subject, r.body, r.message_id, r.created_at
                 FROM ticket_replies r JOIN customers c ON c.id = r.customer_id
                 WHERE lower(r.ticket_id) = lower(?1)
                 ORDER BY r.created_at ASC",
                params![ticket_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("replies_for_ticket: {e}")))?;

        let mut replies = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("replies_for_ticket: {e}")))?
        {
            let reply = row_to_reply(&row)
                .map_err(|e| DatabaseError::Serialization(format!("reply row: {e}")))?;
            replies.push(reply);
        }
        Ok(replies)
    }

    /// Attachments stored against a ticket or reply, in insertion order.
    pub async fn attachments_for(
        &self,
        owner: AttachmentOwner,
        owner_id: &str,
    ) -> Result<Vec<StoredAttachment>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, filename, mime_type, size_bytes, content FROM attachments
                 WHERE owner_kind = ?1 AND owner_id = ?2 ORDER BY rowid ASC",
                params![owner.as_str(), owner_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("attachments_for: {e}")))?;

        let mut attachments = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("attachments_for: {e}")))?
        {
            let attachment = row_to_attachment(&row)
                .map_err(|e| DatabaseError::Serialization(format!("attachment row: {e}")))?;
            attachments.push(attachment);
        }
        Ok(attachments)
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

fn row_to_ticket(row: &Row) -> Result<TicketRef, libsql::Error> {
    let created_str: String = row.get(3)?;
    Ok(TicketRef {
        id: row.get(0)?,
        subject: row.get(1)?,
        status: row.get(2)?,
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_reply(row: &Row) -> Result<StoredReply, libsql::Error> {
    let created_str: String = row.get(6)?;
    Ok(StoredReply {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        customer_email: row.get(2)?,
        subject: row.get(3)?,
        body: row.get(4)?,
        message_id: row.get(5).ok(),
        created_at: parse_datetime(&created_str),
    })
}

fn row_to_attachment(row: &Row) -> Result<StoredAttachment, libsql::Error> {
    Ok(StoredAttachment {
        id: row.get(0)?,
        filename: row.get(1)?,
        mime_type: row.get(2)?,
        size_bytes: row.get(3)?,
        content: row.get(4)?,
    })
}

const TICKET_COLUMNS: &str = "id, subject, status, created_at";

async fn find_ticket_on(conn: &Connection, ticket_id: &str) -> Result<Option<TicketRef>, DatabaseError> {
    let mut rows = conn
        .query(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE lower(id) = lower(?1)"),
            params![ticket_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("find_ticket: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let ticket = row_to_ticket(&row)
                .map_err(|e| DatabaseError::Serialization(format!("ticket row: {e}")))?;
            Ok(Some(ticket))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("find_ticket: {e}"))),
    }
}

/// Find or create the customer for an email, refreshing their display name.
///
/// A display name that is just the address never overwrites a real name.
async fn upsert_customer(conn: &Connection, email: &InboundEmail, now: &str) -> Result<String, DatabaseError> {
    let address = email.from_address.to_lowercase();
    conn.execute(
        "INSERT INTO customers (id, email, name, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(email) DO UPDATE SET
            name = CASE WHEN lower(excluded.name) = excluded.email THEN customers.name ELSE excluded.name END,
            updated_at = excluded.updated_at",
        params![
            Uuid::new_v4().to_string(),
            address.clone(),
            email.from_display_name.clone(),
            now,
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("upsert_customer: {e}")))?;

    let mut rows = conn
        .query("SELECT id FROM customers WHERE email = ?1", params![address.clone()])
        .await
        .map_err(|e| DatabaseError::Query(format!("upsert_customer: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => row
            .get::<String>(0)
            .map_err(|e| DatabaseError::Serialization(format!("customer row: {e}"))),
        Ok(None) => Err(DatabaseError::NotFound {
            entity: "customer".into(),
            id: address,
        }),
        Err(e) => Err(DatabaseError::Query(format!("upsert_customer: {e}"))),
    }
}

async fn insert_attachments(
    conn: &Connection,
    owner: AttachmentOwner,
    owner_id: &str,
    attachments: &[Attachment],
    now: &str,
) -> Result<(), DatabaseError> {
    for att in attachments {
        conn.execute(
            "INSERT INTO attachments (id, owner_kind, owner_id, filename, mime_type, size_bytes, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                Uuid::new_v4().to_string(),
                owner.as_str(),
                owner_id,
                att.filename.clone(),
                att.mime_type.clone(),
                att.size_bytes() as i64,
                libsql::Value::Blob(att.content.clone()),
                now,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert_attachment: {e}")))?;
    }
    Ok(())
}

async fn write_ticket(
    conn: &Connection,
    ticket_id: &str,
    email: &InboundEmail,
    now: &str,
) -> Result<(), DatabaseError> {
    let customer_id = upsert_customer(conn, email, now).await?;

    conn.execute(
        "INSERT INTO tickets (id, customer_id, subject, body, status, source, message_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            ticket_id,
            customer_id,
            email.subject.clone(),
            email.body_text.clone(),
            STATUS_OPEN,
            SOURCE_EMAIL,
            opt_text(email.message_id.as_deref()),
            now,
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_ticket: {e}")))?;

    insert_attachments(conn, AttachmentOwner::Ticket, ticket_id, &email.attachments, now).await
}

/// Returns the canonical ticket id the reply was filed under.
async fn write_reply(
    conn: &Connection,
    reply_id: &str,
    ticket_id: &str,
    email: &InboundEmail,
    now: &str,
) -> Result<String, DatabaseError> {
    let ticket = find_ticket_on(conn, ticket_id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound {
            entity: "ticket".into(),
            id: ticket_id.to_string(),
        })?;

    let customer_id = upsert_customer(conn, email, now).await?;

    conn.execute(
        "INSERT INTO ticket_replies (id, ticket_id, customer_id, subject, body, message_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            reply_id,
            ticket.id.clone(),
            customer_id,
            email.subject.clone(),
            email.body_text.clone(),
            opt_text(email.message_id.as_deref()),
            now,
        ],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("insert_reply: {e}")))?;

    conn.execute(
        "UPDATE tickets SET updated_at = ?1 WHERE id = ?2",
        params![now, ticket.id.clone()],
    )
    .await
    .map_err(|e| DatabaseError::Query(format!("touch_ticket: {e}")))?;

    insert_attachments(conn, AttachmentOwner::Reply, reply_id, &email.attachments, now).await?;
    Ok(ticket.id)
}

/// Commit on success, roll back on failure.
async fn finish<T>(
    tx: libsql::Transaction,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DatabaseError::Query(format!("commit: {e}")))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl TicketStore for LibSqlTicketStore {
    async fn create_ticket_from_email(
        &self,
        email: &InboundEmail,
    ) -> Result<TicketRef, DatabaseError> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let ticket_id = Uuid::new_v4().to_string();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("begin: {e}")))?;
        let result = write_ticket(&tx, &ticket_id, email, &now_str).await;
        finish(tx, result).await?;

        debug!(ticket_id = %ticket_id, "Ticket inserted into DB");
        Ok(TicketRef {
            id: ticket_id,
            subject: email.subject.clone(),
            status: STATUS_OPEN.to_string(),
            created_at: now,
        })
    }

    async fn create_reply_from_email(
        &self,
        ticket_id: &str,
        email: &InboundEmail,
    ) -> Result<ReplyRef, DatabaseError> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let reply_id = Uuid::new_v4().to_string();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("begin: {e}")))?;
        let result = write_reply(&tx, &reply_id, ticket_id, email, &now_str).await;
        let ticket_id = finish(tx, result).await?;

        debug!(reply_id = %reply_id, ticket_id = %ticket_id, "Reply inserted into DB");
        Ok(ReplyRef {
            id: reply_id,
            ticket_id,
            created_at: now,
        })
    }

    async fn find_ticket(&self, ticket_id: &str) -> Result<Option<TicketRef>, DatabaseError> {
        find_ticket_on(&self.conn, ticket_id).await
    }
}
