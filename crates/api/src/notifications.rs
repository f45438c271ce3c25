//! Email delivery for expense notifications.

use async_trait::async_trait;
use tracing::{debug, warn};

use expensa_core::expense::{ExpenseNotification, NotificationDispatcher, NotificationError};
use expensa_db::{ActorContact, ActorRepository};
use expensa_shared::types::ActorId;
use expensa_shared::{EmailContent, EmailService};

/// Folds per-recipient delivery results into one outcome naming every
/// recipient that was missed.
fn delivery_outcome(
    results: impl IntoIterator<Item = (ActorId, Result<(), NotificationError>)>,
) -> Result<(), NotificationError> {
    let failed: Vec<String> = results
        .into_iter()
        .filter_map(|(actor, result)| {
            result.err().map(|e| {
                warn!(recipient = %actor, error = %e, "Notification email failed");
                format!("{actor}: {e}")
            })
        })
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(NotificationError::Delivery(format!(
            "{} recipient(s) not reached: {}",
            failed.len(),
            failed.join("; ")
        )))
    }
}

/// Sends expense notifications over SMTP.
///
/// Approval requests go to every active top-level approver. Decisions go to
/// the submitter.
#[derive(Debug, Clone)]
pub struct EmailNotificationDispatcher {
    email: EmailService,
    actors: ActorRepository,
}

impl EmailNotificationDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(email: EmailService, actors: ActorRepository) -> Self {
        Self { email, actors }
    }

    async fn contact(&self, actor: ActorId) -> Result<ActorContact, NotificationError> {
        self.actors
            .find_contact(actor)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?
            .ok_or(NotificationError::RecipientNotFound(actor))
    }

    async fn deliver(
        &self,
        to: &ActorContact,
        content: &EmailContent,
    ) -> Result<(), NotificationError> {
        debug!(to = %to.id, subject = %content.subject, "Sending notification email");
        self.email
            .send(&to.email, content)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl NotificationDispatcher for EmailNotificationDispatcher {
    async fn notify(&self, notification: &ExpenseNotification) -> Result<(), NotificationError> {
        match notification {
            ExpenseNotification::ApprovalRequested {
                expense_id,
                title,
                amount,
                submitted_by,
            } => {
                let submitter = self.contact(*submitted_by).await?;
                let approvers = self
                    .actors
                    .top_level_approvers()
                    .await
                    .map_err(|e| NotificationError::Delivery(e.to_string()))?;

                let mut results = Vec::with_capacity(approvers.len());
                for approver in &approvers {
                    let content = self.email.approval_request(
                        &approver.display_name,
                        &expense_id.to_string(),
                        title,
                        &amount.to_string(),
                        &submitter.display_name,
                    );
                    results.push((approver.id, self.deliver(approver, &content).await));
                }
                delivery_outcome(results)
            }
            ExpenseNotification::ExpenseApproved {
                expense_id,
                title,
                submitter,
                ..
            } => {
                let to = self.contact(*submitter).await?;
                let content = self.email.decision(
                    &to.display_name,
                    &expense_id.to_string(),
                    title,
                    "approved",
                    None,
                );
                self.deliver(&to, &content).await
            }
            ExpenseNotification::ExpenseRejected {
                expense_id,
                title,
                submitter,
                reason,
                ..
            } => {
                let to = self.contact(*submitter).await?;
                let content = self.email.decision(
                    &to.display_name,
                    &expense_id.to_string(),
                    title,
                    "rejected",
                    Some(reason),
                );
                self.deliver(&to, &content).await
            }
        }
    }
}
