use anyhow::{Result, anyhow};
use chrono::Utc;
use surrealdb::sql::Datetime;
use tracing::error;

use crate::db::{Db, InvitationCheck, InvitationRecord};
use crate::types::InvitationCode;

/// Store for invitation code validation.
///
/// Invitations are provisioned out of band; this store only reads them and
/// marks them as redeemed.
#[derive(Clone)]
pub struct InvitationStore {
    db: Db,
}

impl InvitationStore {
    /// Create a new invitation store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Validate an invitation code for an email address.
    ///
    /// Lookups are scoped by email. A matching code marks the invitation as
    /// redeemed and stamps `last_checked_at`. This method never errors:
    /// database failures are logged and reported as an invalid check.
    pub async fn check_invitation(&self, email: &str, code: &InvitationCode) -> InvitationCheck {
        match self.try_check(email, code).await {
            Ok(check) => check,
            Err(e) => {
                error!(email = %email, "error checking invitation: {:#}", e);
                InvitationCheck::invalid("Error occurred while checking invitation")
            }
        }
    }

    async fn try_check(&self, email: &str, code: &InvitationCode) -> Result<InvitationCheck> {
        let mut res = self
            .db
            .query("SELECT * FROM invitation WHERE email = $email")
            .bind(("email", email.to_string()))
            .await?;

        let invitations: Vec<InvitationRecord> = res.take(0)?;
        for invitation in invitations {
            if invitation.invitation_code != *code {
                continue;
            }

            let now = Datetime::from(Utc::now());
            let mut res = self
                .db
                .query(
                    r#"
                    UPDATE invitation SET
                        has_checked_invitation = true,
                        last_checked_at = $now
                    WHERE email = $email
                      AND invitation_code = $code
                    "#,
                )
                .bind(("now", now))
                .bind(("email", email.to_string()))
                .bind(("code", code.clone()))
                .await?;

            let updated: Vec<InvitationRecord> = res.take(0)?;
            let updated = updated
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("no response from invitation update"))?;

            return Ok(InvitationCheck::valid(updated));
        }

        Ok(InvitationCheck::invalid("Invitation not found"))
    }
}
