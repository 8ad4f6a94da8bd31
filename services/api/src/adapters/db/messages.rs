//! services/api/src/adapters/db/messages.rs
//!
//! `MessageStore` implementation. Each party side is stored as a
//! (role, id) column pair; inbox filters are appended as optional WHERE
//! clauses with positional binds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::domain::{
    Attachment, Message, MessageFilters, MessagePriority, MessageType, PartyRef,
};
use portal_core::ports::{MessageStore, PortError, PortResult};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::{map_db_err, PgStore};

const MESSAGE_COLUMNS: &str = "id, sender_role, sender_id, recipient_role, recipient_id, \
     subject, content, message_type, priority, appointment_id, is_read, read_at, attachments, \
     is_archived, parent_id, thread_id, created_at";

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_role: String,
    sender_id: Uuid,
    recipient_role: String,
    recipient_id: Uuid,
    subject: String,
    content: String,
    message_type: String,
    priority: String,
    appointment_id: Option<Uuid>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
    attachments: Json<Vec<Attachment>>,
    is_archived: bool,
    parent_id: Option<Uuid>,
    thread_id: Uuid,
    created_at: DateTime<Utc>,
}

fn parse_party(role: &str, id: Uuid) -> PortResult<PartyRef> {
    let role = portal_core::domain::Role::parse(role)
        .ok_or_else(|| PortError::Unexpected(format!("stored party role '{role}' is invalid")))?;
    Ok(PartyRef { role, id })
}

impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        let message_type = MessageType::parse(&self.message_type).ok_or_else(|| {
            PortError::Unexpected(format!(
                "stored message type '{}' is invalid",
                self.message_type
            ))
        })?;
        let priority = MessagePriority::parse(&self.priority).ok_or_else(|| {
            PortError::Unexpected(format!("stored priority '{}' is invalid", self.priority))
        })?;
        Ok(Message {
            id: self.id,
            sender: parse_party(&self.sender_role, self.sender_id)?,
            recipient: parse_party(&self.recipient_role, self.recipient_id)?,
            subject: self.subject,
            content: self.content,
            message_type,
            priority,
            appointment_id: self.appointment_id,
            is_read: self.is_read,
            read_at: self.read_at,
            attachments: self.attachments.0,
            is_archived: self.is_archived,
            parent_id: self.parent_id,
            thread_id: self.thread_id,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert(&self, message: Message) -> PortResult<Message> {
        let sql = format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(message.id)
            .bind(message.sender.role.as_str())
            .bind(message.sender.id)
            .bind(message.recipient.role.as_str())
            .bind(message.recipient.id)
            .bind(&message.subject)
            .bind(&message.content)
            .bind(message.message_type.as_str())
            .bind(message.priority.as_str())
            .bind(message.appointment_id)
            .bind(message.is_read)
            .bind(message.read_at)
            .bind(Json(&message.attachments))
            .bind(message.is_archived)
            .bind(message.parent_id)
            .bind(message.thread_id)
            .bind(message.created_at)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "message"))?
            .to_domain()
    }

    async fn get(&self, id: Uuid) -> PortResult<Message> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(id)
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, &format!("message {id}")))?
            .to_domain()
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> PortResult<()> {
        let result = sqlx::query("UPDATE messages SET is_read = TRUE, read_at = $2 WHERE id = $1")
            .bind(id)
            .bind(read_at)
            .execute(self.pool())
            .await
            .map_err(|e| map_db_err(e, "message"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("message {id} not found")));
        }
        Ok(())
    }

    async fn mark_many_read(
        &self,
        ids: &[Uuid],
        recipient: PartyRef,
        read_at: DateTime<Utc>,
    ) -> PortResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE, read_at = $1 \
             WHERE id = ANY($2) AND recipient_role = $3 AND recipient_id = $4 \
             AND is_read = FALSE",
        )
        .bind(read_at)
        .bind(ids)
        .bind(recipient.role.as_str())
        .bind(recipient.id)
        .execute(self.pool())
        .await
        .map_err(|e| map_db_err(e, "messages"))?;
        Ok(result.rows_affected())
    }

    async fn thread(&self, thread_id: Uuid) -> PortResult<Vec<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE thread_id = $1 ORDER BY created_at ASC"
        );
        let records = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(thread_id)
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_db_err(e, "messages"))?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn delete(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| map_db_err(e, "message"))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("message {id} not found")));
        }
        Ok(())
    }

    async fn list_received(
        &self,
        recipient: PartyRef,
        filters: MessageFilters,
        offset: u64,
        limit: u64,
    ) -> PortResult<(Vec<Message>, u64)> {
        let mut clauses =
            String::from("WHERE recipient_role = $1 AND recipient_id = $2");
        let mut next_bind = 3;
        if filters.message_type.is_some() {
            clauses.push_str(&format!(" AND message_type = ${next_bind}"));
            next_bind += 1;
        }
        if filters.is_read.is_some() {
            clauses.push_str(&format!(" AND is_read = ${next_bind}"));
            next_bind += 1;
        }
        if filters.priority.is_some() {
            clauses.push_str(&format!(" AND priority = ${next_bind}"));
            next_bind += 1;
        }

        let count_sql = format!("SELECT COUNT(*) FROM messages {clauses}");
        let mut count_query = sqlx::query_as::<_, (i64,)>(&count_sql)
            .bind(recipient.role.as_str())
            .bind(recipient.id);
        if let Some(t) = filters.message_type {
            count_query = count_query.bind(t.as_str());
        }
        if let Some(r) = filters.is_read {
            count_query = count_query.bind(r);
        }
        if let Some(p) = filters.priority {
            count_query = count_query.bind(p.as_str());
        }
        let (total,) = count_query
            .fetch_one(self.pool())
            .await
            .map_err(|e| map_db_err(e, "messages"))?;

        let list_sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages {clauses} \
             ORDER BY created_at DESC OFFSET ${next_bind} LIMIT ${}",
            next_bind + 1
        );
        let mut list_query = sqlx::query_as::<_, MessageRecord>(&list_sql)
            .bind(recipient.role.as_str())
            .bind(recipient.id);
        if let Some(t) = filters.message_type {
            list_query = list_query.bind(t.as_str());
        }
        if let Some(r) = filters.is_read {
            list_query = list_query.bind(r);
        }
        if let Some(p) = filters.priority {
            list_query = list_query.bind(p.as_str());
        }
        let records = list_query
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_db_err(e, "messages"))?;

        let items = records
            .into_iter()
            .map(|r| r.to_domain())
            .collect::<PortResult<Vec<_>>>()?;
        Ok((items, total as u64))
    }

    async fn unread_count(&self, recipient: PartyRef) -> PortResult<u64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM messages \
             WHERE recipient_role = $1 AND recipient_id = $2 AND is_read = FALSE",
        )
        .bind(recipient.role.as_str())
        .bind(recipient.id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_db_err(e, "messages"))?;
        Ok(count as u64)
    }
}
