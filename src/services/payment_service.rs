use crate::AppState;
use crate::error::AppError;
use crate::models::Order;
use crate::services::{crm_service, email_service};
use crate::store::{Decision, Settled};

/// How the gateway reported a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved,
    Declined,
    Unknown,
}

impl PaymentOutcome {
    /// Canonical mapping from the gateway's outcome code. `"1"` is the
    /// approved sentinel on the redirect; webhooks carry status strings
    /// (in English or Spanish depending on the provider's mood).
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "1" | "approved" | "aprobada" | "success" | "paid" | "completed" => {
                PaymentOutcome::Approved
            }
            "declined" | "rechazada" | "failed" | "canceled" => PaymentOutcome::Declined,
            _ => PaymentOutcome::Unknown,
        }
    }
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    /// This call won the transition to completed. `email_error` records a
    /// notification failure; the order stays completed regardless.
    Confirmed {
        order: Order,
        email_error: Option<String>,
    },
    Declined {
        order: Order,
    },
    /// A terminal decision was already recorded; nothing was re-applied.
    AlreadyProcessed {
        order: Order,
    },
    /// Unrecognized outcome code; the order was left untouched.
    Unknown,
}

/// The single confirmation path. Both the client-redirect confirmation and
/// the provider webhook land here, so repeated or racing deliveries for the
/// same order converge: the first terminal decision wins, every later call
/// gets `AlreadyProcessed` and causes no side effects.
pub async fn confirm_payment(
    state: &AppState,
    order_id: &str,
    code: &str,
    payment_reference: Option<String>,
) -> Result<ConfirmOutcome, AppError> {
    let decision = match PaymentOutcome::from_code(code) {
        PaymentOutcome::Approved => Decision::Approved,
        PaymentOutcome::Declined => Decision::Declined,
        PaymentOutcome::Unknown => {
            if !state.orders.contains(order_id) {
                return Err(AppError::OrderNotFound(order_id.to_string()));
            }
            tracing::warn!(order_id, code, "unknown payment outcome code, ignoring");
            return Ok(ConfirmOutcome::Unknown);
        }
    };

    match state.orders.settle(order_id, decision, payment_reference)? {
        Settled::AlreadyProcessed(order) => {
            tracing::info!(order_id, "order already processed");
            Ok(ConfirmOutcome::AlreadyProcessed { order })
        }
        Settled::Applied(order) => match decision {
            Decision::Approved => {
                tracing::info!(order_id, "payment approved, order completed");

                // A failed notification never rolls the order back; it is
                // reported so an operator can replay the email.
                let email_error = match email_service::notify_order(
                    state.mailer.as_ref(),
                    &state.settings,
                    &order,
                )
                .await
                {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!(order_id, "order notification failed: {e}");
                        Some(e.to_string())
                    }
                };

                crm_service::spawn_sync(state, order.clone());

                Ok(ConfirmOutcome::Confirmed { order, email_error })
            }
            Decision::Declined => {
                tracing::info!(order_id, "payment declined, order failed");
                Ok(ConfirmOutcome::Declined { order })
            }
        },
    }
}
