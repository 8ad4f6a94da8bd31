//! crates/portal_core/src/identity.rs
//!
//! Credential validation and the password-reset flow. Hashing itself lives
//! at the edge (the API service owns argon2); this module owns the reset
//! token lifecycle, including the compensating write that clears a dangling
//! token when mail delivery fails so an account is never left half-reset.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::{Identity, Role};
use crate::ports::{Email, FieldError, IdentityStore, Mailer, PortError, PortResult};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Field-level checks shared by registration and password changes.
pub fn validate_credentials(email: &str, password: &str) -> PortResult<()> {
    let mut errors = Vec::new();
    if email.trim().is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
        errors.push(FieldError::new("email", "a valid email address is required"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            "password must be at least 8 characters",
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortError::Validation(errors))
    }
}

/// Generates and stores a reset token for the account with this email, then
/// hands the reset link to the notification sender.
///
/// If delivery fails, the token pair is cleared before `Upstream` is
/// reported, so the account does not sit in a pending-reset state whose
/// token was never delivered.
pub async fn start_password_reset(
    identities: &dyn IdentityStore,
    mailer: &dyn Mailer,
    role: Role,
    email: &str,
    token_ttl: Duration,
    reset_url_base: &str,
) -> PortResult<()> {
    let identity = identities
        .find_by_email(role, email)
        .await?
        .ok_or_else(|| PortError::NotFound("no account registered for that email".to_string()))?;

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = Utc::now() + token_ttl;
    identities
        .set_reset_token(role, identity.id(), &token, expires_at)
        .await?;

    let reset_url = format!("{reset_url_base}/{token}");
    let outbound = Email {
        to: identity.email().to_string(),
        subject: "Password reset request".to_string(),
        text_body: format!(
            "You requested a password reset. Open the link below to choose a new password.\n\n{reset_url}\n\nIf you did not request this, ignore this message."
        ),
        html_body: format!(
            "<p>You requested a password reset. <a href=\"{reset_url}\">Choose a new password</a>.</p><p>If you did not request this, ignore this message.</p>"
        ),
    };

    if let Err(send_err) = mailer.send(&outbound).await {
        identities.clear_reset_token(role, identity.id()).await?;
        return Err(PortError::Upstream(format!(
            "password reset mail could not be sent: {send_err}"
        )));
    }
    Ok(())
}

/// Redeems a reset token: sets the already-hashed new password and clears
/// the token pair. An unknown or expired token is a validation failure, not
/// a hint about which accounts exist.
pub async fn finish_password_reset(
    identities: &dyn IdentityStore,
    role: Role,
    token: &str,
    new_password_hash: &str,
) -> PortResult<Identity> {
    let identity = identities
        .find_by_reset_token(role, token)
        .await?
        .filter(|identity| {
            identity
                .reset_token_expires()
                .is_some_and(|expires| expires > Utc::now())
        })
        .ok_or_else(|| PortError::invalid("token", "invalid or expired reset token"))?;

    identities
        .set_password_hash(role, identity.id(), new_password_hash)
        .await?;
    identities.clear_reset_token(role, identity.id()).await?;
    Ok(identity)
}
