//! crates/portal_core/src/messaging.rs
//!
//! Point-to-point messaging between a patient and a doctor, grouped into
//! threads. The thread id is derived exactly once, at creation: a root
//! message's thread id is its own id, a reply copies its parent's. It is
//! never recomputed afterward, so every message of a reply chain of any
//! depth carries the root's id.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Caller, Inbox, Message, MessageFilters, MessagePriority, MessageType, OutgoingMessage,
    PageRequest, PartyRef, Role,
};
use crate::ports::{FieldError, IdentityStore, MessageStore, PortError, PortResult};

const MAX_SUBJECT_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 2000;

fn validate_content(subject: &str, content: &str) -> PortResult<()> {
    let mut errors = Vec::new();
    if subject.trim().is_empty() {
        errors.push(FieldError::new("subject", "subject must not be empty"));
    }
    if subject.len() > MAX_SUBJECT_LEN {
        errors.push(FieldError::new("subject", "subject is too long"));
    }
    if content.trim().is_empty() {
        errors.push(FieldError::new("content", "content must not be empty"));
    }
    if content.len() > MAX_CONTENT_LEN {
        errors.push(FieldError::new("content", "content is too long"));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortError::Validation(errors))
    }
}

async fn ensure_party_exists(identities: &dyn IdentityStore, party: PartyRef) -> PortResult<()> {
    match party.role {
        Role::Patient => identities.get_patient(party.id).await.map(|_| ()),
        Role::Doctor => identities.get_doctor(party.id).await.map(|_| ()),
    }
}

/// Sends a root message. The recipient must exist under its declared
/// identity variant and sit on the other side of the patient/doctor line.
/// The new message's thread id equals its own id.
pub async fn send(
    identities: &dyn IdentityStore,
    messages: &dyn MessageStore,
    caller: Caller,
    outgoing: OutgoingMessage,
) -> PortResult<Message> {
    validate_content(&outgoing.subject, &outgoing.content)?;
    if outgoing.recipient.role == caller.role {
        return Err(PortError::invalid(
            "recipient",
            "messages go between a patient and a doctor",
        ));
    }
    ensure_party_exists(identities, outgoing.recipient).await?;

    let id = Uuid::new_v4();
    messages
        .insert(Message {
            id,
            sender: caller.into(),
            recipient: outgoing.recipient,
            subject: outgoing.subject,
            content: outgoing.content,
            message_type: outgoing.message_type.unwrap_or(MessageType::General),
            priority: outgoing.priority.unwrap_or(MessagePriority::Normal),
            appointment_id: outgoing.appointment_id,
            is_read: false,
            read_at: None,
            attachments: outgoing.attachments,
            is_archived: false,
            parent_id: None,
            // First-write derivation: a root message roots its own thread.
            thread_id: id,
            created_at: Utc::now(),
        })
        .await
}

/// Replies to an existing message. The caller must be a party of the
/// parent; the reply goes to whichever of the parent's two parties the
/// caller is not, and inherits type, priority, appointment link, and
/// thread id.
pub async fn reply(
    messages: &dyn MessageStore,
    caller: Caller,
    parent_id: Uuid,
    content: String,
) -> PortResult<Message> {
    let parent = messages.get(parent_id).await?;
    let caller_ref = PartyRef::from(caller);

    let recipient = if parent.sender == caller_ref {
        parent.recipient
    } else if parent.recipient == caller_ref {
        parent.sender
    } else {
        return Err(PortError::Forbidden(
            "caller is not a party of this conversation".to_string(),
        ));
    };

    // The subject is derived, not caller-supplied: cap it at the limit
    // (on a char boundary) instead of failing validation for a long parent.
    let mut subject = format!("Re: {}", parent.subject);
    if subject.len() > MAX_SUBJECT_LEN {
        let mut cut = MAX_SUBJECT_LEN;
        while !subject.is_char_boundary(cut) {
            cut -= 1;
        }
        subject.truncate(cut);
    }
    validate_content(&subject, &content)?;

    messages
        .insert(Message {
            id: Uuid::new_v4(),
            sender: caller_ref,
            recipient,
            subject,
            content,
            message_type: parent.message_type,
            priority: parent.priority,
            appointment_id: parent.appointment_id,
            is_read: false,
            read_at: None,
            attachments: Vec::new(),
            is_archived: false,
            parent_id: Some(parent.id),
            thread_id: parent.thread_id,
            created_at: Utc::now(),
        })
        .await
}

/// Marks one message read. Recipient-only; marking an already-read message
/// is a no-op that still succeeds.
pub async fn mark_read(
    messages: &dyn MessageStore,
    caller: Caller,
    id: Uuid,
) -> PortResult<Message> {
    let mut message = messages.get(id).await?;
    if message.recipient != PartyRef::from(caller) {
        return Err(PortError::Forbidden(
            "only the recipient may mark a message read".to_string(),
        ));
    }
    if !message.is_read {
        let now = Utc::now();
        messages.mark_read(id, now).await?;
        message.is_read = true;
        message.read_at = Some(now);
    }
    Ok(message)
}

/// Bulk mark-read over the caller's own unread messages; returns the count
/// actually modified.
pub async fn mark_many_read(
    messages: &dyn MessageStore,
    caller: Caller,
    ids: &[Uuid],
) -> PortResult<u64> {
    messages
        .mark_many_read(ids, caller.into(), Utc::now())
        .await
}

/// Returns the thread's messages visible to the caller, oldest first. As a
/// side effect, every unread message addressed to the caller in the result
/// is marked read.
pub async fn get_thread(
    messages: &dyn MessageStore,
    caller: Caller,
    thread_id: Uuid,
) -> PortResult<Vec<Message>> {
    let caller_ref = PartyRef::from(caller);
    let mut visible: Vec<Message> = messages
        .thread(thread_id)
        .await?
        .into_iter()
        .filter(|m| m.sender == caller_ref || m.recipient == caller_ref)
        .collect();

    if visible.is_empty() {
        return Err(PortError::NotFound(format!("thread {thread_id} not found")));
    }

    let now = Utc::now();
    for message in visible.iter_mut() {
        if message.recipient == caller_ref && !message.is_read {
            messages.mark_read(message.id, now).await?;
            message.is_read = true;
            message.read_at = Some(now);
        }
    }
    Ok(visible)
}

/// Recipient-only hard delete.
pub async fn delete(messages: &dyn MessageStore, caller: Caller, id: Uuid) -> PortResult<()> {
    let message = messages.get(id).await?;
    if message.recipient != PartyRef::from(caller) {
        return Err(PortError::Forbidden(
            "only the recipient may delete a message".to_string(),
        ));
    }
    messages.delete(id).await
}

/// Fetches one message; sender and recipient may both read it.
pub async fn get(messages: &dyn MessageStore, caller: Caller, id: Uuid) -> PortResult<Message> {
    let message = messages.get(id).await?;
    let caller_ref = PartyRef::from(caller);
    if message.sender != caller_ref && message.recipient != caller_ref {
        return Err(PortError::Forbidden(
            "caller is not a party of this message".to_string(),
        ));
    }
    Ok(message)
}

/// The caller's inbox: received messages matching the filters, newest
/// first, plus an unread count that ignores the filters.
pub async fn inbox(
    messages: &dyn MessageStore,
    caller: Caller,
    filters: MessageFilters,
    page: PageRequest,
) -> PortResult<Inbox> {
    let recipient = PartyRef::from(caller);
    let (items, total) = messages
        .list_received(recipient, filters, page.offset(), page.limit)
        .await?;
    let unread_count = messages.unread_count(recipient).await?;
    Ok(Inbox {
        messages: items,
        total,
        page_count: total.div_ceil(page.limit),
        unread_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{fixtures, MemoryIdentityStore, MemoryMessageStore};

    fn outgoing(recipient: PartyRef, subject: &str) -> OutgoingMessage {
        OutgoingMessage {
            recipient,
            subject: subject.to_string(),
            content: "hello".to_string(),
            message_type: None,
            priority: None,
            appointment_id: None,
            attachments: Vec::new(),
        }
    }

    async fn seeded() -> (MemoryIdentityStore, MemoryMessageStore, Caller, Caller) {
        let identities = MemoryIdentityStore::default();
        let patient = identities.create_patient(fixtures::patient()).await.unwrap();
        let doctor = identities.create_doctor(fixtures::doctor()).await.unwrap();
        (
            identities,
            MemoryMessageStore::default(),
            Caller { id: patient.id, role: Role::Patient },
            Caller { id: doctor.id, role: Role::Doctor },
        )
    }

    #[tokio::test]
    async fn root_message_threads_on_its_own_id_with_defaults() {
        let (identities, messages, patient, doctor) = seeded().await;

        let message = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "question"),
        )
        .await
        .unwrap();

        assert_eq!(message.thread_id, message.id);
        assert_eq!(message.message_type, MessageType::General);
        assert_eq!(message.priority, MessagePriority::Normal);
        assert!(message.parent_id.is_none());
        assert!(!message.is_read);
    }

    #[tokio::test]
    async fn send_validates_recipient_and_content() {
        let (identities, messages, patient, _doctor) = seeded().await;

        // Unknown doctor id under the declared variant.
        let err = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::doctor(Uuid::new_v4()), "question"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        // Patient-to-patient is not a valid lane.
        let err = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::patient(Uuid::new_v4()), "question"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));

        let (identities, messages, patient, doctor) = seeded().await;
        let mut oversized = outgoing(PartyRef::from(doctor), "question");
        oversized.content = "x".repeat(MAX_CONTENT_LEN + 1);
        let err = send(&identities, &messages, patient, oversized)
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn reply_chain_of_depth_n_shares_the_root_thread_id() {
        let (identities, messages, patient, doctor) = seeded().await;

        let root = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "knee pain"),
        )
        .await
        .unwrap();

        let mut last = root.clone();
        let mut from_doctor = true;
        for _ in 0..4 {
            let caller = if from_doctor { doctor } else { patient };
            last = reply(&messages, caller, last.id, "and another thing".to_string())
                .await
                .unwrap();
            from_doctor = !from_doctor;
        }

        let thread = messages.thread(root.id).await.unwrap();
        assert_eq!(thread.len(), 5);
        assert!(thread.iter().all(|m| m.thread_id == root.id));
    }

    #[tokio::test]
    async fn reply_inherits_parent_fields_and_computes_the_other_party() {
        let (identities, messages, patient, doctor) = seeded().await;

        let appointment_id = Some(Uuid::new_v4());
        let mut root_payload = outgoing(PartyRef::from(doctor), "after the visit");
        root_payload.message_type = Some(MessageType::AppointmentRequest);
        root_payload.priority = Some(MessagePriority::High);
        root_payload.appointment_id = appointment_id;
        let root = send(&identities, &messages, patient, root_payload)
            .await
            .unwrap();

        let response = reply(&messages, doctor, root.id, "come in tomorrow".to_string())
            .await
            .unwrap();

        assert_eq!(response.subject, "Re: after the visit");
        assert_eq!(response.recipient, PartyRef::from(patient));
        assert_eq!(response.sender, PartyRef::from(doctor));
        assert_eq!(response.message_type, MessageType::AppointmentRequest);
        assert_eq!(response.priority, MessagePriority::High);
        assert_eq!(response.appointment_id, appointment_id);
        assert_eq!(response.parent_id, Some(root.id));
        assert_eq!(response.thread_id, root.id);
    }

    #[tokio::test]
    async fn reply_to_a_max_length_subject_truncates_instead_of_failing() {
        let (identities, messages, patient, doctor) = seeded().await;

        let root = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), &"s".repeat(MAX_SUBJECT_LEN)),
        )
        .await
        .unwrap();

        let response = reply(&messages, doctor, root.id, "noted".to_string())
            .await
            .unwrap();
        assert!(response.subject.starts_with("Re: "));
        assert_eq!(response.subject.len(), MAX_SUBJECT_LEN);
    }

    #[tokio::test]
    async fn outsiders_cannot_reply() {
        let (identities, messages, patient, doctor) = seeded().await;
        let root = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "private"),
        )
        .await
        .unwrap();

        let outsider = Caller { id: Uuid::new_v4(), role: Role::Doctor };
        let err = reply(&messages, outsider, root.id, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));
    }

    #[tokio::test]
    async fn mark_read_is_recipient_only_and_idempotent() {
        let (identities, messages, patient, doctor) = seeded().await;
        let message = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "question"),
        )
        .await
        .unwrap();

        // The sender is not the recipient.
        let err = mark_read(&messages, patient, message.id).await.unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));

        let once = mark_read(&messages, doctor, message.id).await.unwrap();
        assert!(once.is_read);
        let read_at = once.read_at.unwrap();

        // Second call succeeds and does not move the timestamp.
        let twice = mark_read(&messages, doctor, message.id).await.unwrap();
        assert!(twice.is_read);
        assert_eq!(twice.read_at, Some(read_at));
    }

    #[tokio::test]
    async fn bulk_mark_read_only_touches_the_callers_unread_messages() {
        let (identities, messages, patient, doctor) = seeded().await;

        let to_doctor_1 = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "one"),
        )
        .await
        .unwrap();
        let to_doctor_2 = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "two"),
        )
        .await
        .unwrap();
        let to_patient = send(
            &identities,
            &messages,
            doctor,
            outgoing(PartyRef::from(patient), "three"),
        )
        .await
        .unwrap();

        mark_read(&messages, doctor, to_doctor_2.id).await.unwrap();

        // One already read, one addressed to someone else: only one left.
        let modified = mark_many_read(
            &messages,
            doctor,
            &[to_doctor_1.id, to_doctor_2.id, to_patient.id],
        )
        .await
        .unwrap();
        assert_eq!(modified, 1);
    }

    #[tokio::test]
    async fn get_thread_marks_incoming_unread_messages_read() {
        let (identities, messages, patient, doctor) = seeded().await;

        let root = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "hello"),
        )
        .await
        .unwrap();
        reply(&messages, doctor, root.id, "hello back".to_string())
            .await
            .unwrap();

        // The patient opens the thread: the doctor's reply flips to read,
        // the patient's own outgoing message is untouched.
        let thread = get_thread(&messages, patient, root.id).await.unwrap();
        assert_eq!(thread.len(), 2);
        assert!(!thread[0].is_read);
        assert!(thread[1].is_read);

        let unread = messages.unread_count(PartyRef::from(patient)).await.unwrap();
        assert_eq!(unread, 0);

        let outsider = Caller { id: Uuid::new_v4(), role: Role::Patient };
        let err = get_thread(&messages, outsider, root.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_recipient_only() {
        let (identities, messages, patient, doctor) = seeded().await;
        let message = send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "disposable"),
        )
        .await
        .unwrap();

        let err = delete(&messages, patient, message.id).await.unwrap_err();
        assert!(matches!(err, PortError::Forbidden(_)));

        delete(&messages, doctor, message.id).await.unwrap();
        let err = messages.get(message.id).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn inbox_filters_apply_but_unread_count_ignores_them() {
        let (identities, messages, patient, doctor) = seeded().await;

        let mut urgent = outgoing(PartyRef::from(doctor), "urgent");
        urgent.priority = Some(MessagePriority::Urgent);
        send(&identities, &messages, patient, urgent).await.unwrap();

        let mut prescription = outgoing(PartyRef::from(doctor), "refill");
        prescription.message_type = Some(MessageType::Prescription);
        let prescription = send(&identities, &messages, patient, prescription)
            .await
            .unwrap();
        mark_read(&messages, doctor, prescription.id).await.unwrap();

        send(
            &identities,
            &messages,
            patient,
            outgoing(PartyRef::from(doctor), "plain"),
        )
        .await
        .unwrap();

        let filtered = inbox(
            &messages,
            doctor,
            MessageFilters {
                is_read: Some(false),
                ..Default::default()
            },
            PageRequest::new(None, None),
        )
        .await
        .unwrap();
        assert_eq!(filtered.total, 2);
        assert_eq!(filtered.unread_count, 2);

        let by_type = inbox(
            &messages,
            doctor,
            MessageFilters {
                message_type: Some(MessageType::Prescription),
                ..Default::default()
            },
            PageRequest::new(None, None),
        )
        .await
        .unwrap();
        assert_eq!(by_type.total, 1);
        // Unread count stays global even under a filter that excludes the
        // unread ones.
        assert_eq!(by_type.unread_count, 2);

        let everything = inbox(
            &messages,
            doctor,
            MessageFilters::default(),
            PageRequest::new(Some(1), Some(2)),
        )
        .await
        .unwrap();
        assert_eq!(everything.messages.len(), 2);
        assert_eq!(everything.total, 3);
        assert_eq!(everything.page_count, 2);
    }

    #[tokio::test]
    async fn completed_appointment_scenario_threads_correctly() {
        // Doctor marks an appointment completed elsewhere; the patient then
        // messages about it and the doctor replies.
        let (identities, messages, patient, doctor) = seeded().await;
        let appointment_id = Uuid::new_v4();

        let mut note = outgoing(PartyRef::from(doctor), "about my visit");
        note.message_type = Some(MessageType::General);
        note.appointment_id = Some(appointment_id);
        let note = send(&identities, &messages, patient, note).await.unwrap();

        let response = reply(&messages, doctor, note.id, "healing well".to_string())
            .await
            .unwrap();

        assert_eq!(response.thread_id, note.id);
        assert_eq!(response.subject, "Re: about my visit");
        assert_eq!(response.appointment_id, Some(appointment_id));
    }
}
