//! services/api/src/adapters/mailer.rs
//!
//! The outbound mail adapter. There is no SMTP relay in this deployment;
//! reset emails are emitted to the log where the operator (or a dev
//! reading the console) can pick up the link. Swapping in a real
//! transport only means replacing this one impl of the `Mailer` port.

use async_trait::async_trait;
use portal_core::ports::{Email, Mailer, PortResult};
use tracing::info;

pub struct TracingMailer {
    from: String,
}

impl TracingMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, email: &Email) -> PortResult<()> {
        info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            body = %email.text_body,
            "outbound email"
        );
        Ok(())
    }
}
