use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::AppError;
use crate::models::{Order, OrderStatus};

/// Terminal decision applied by the payment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Declined,
}

/// Result of the processed-flag check-and-set.
#[derive(Debug, Clone)]
pub enum Settled {
    /// This call won the transition; the order carries the new state.
    Applied(Order),
    /// A previous call already recorded a terminal decision.
    AlreadyProcessed(Order),
}

/// In-memory order map, process lifetime only. A restart loses pending
/// orders and later confirmations will see `OrderNotFound`.
#[derive(Clone, Default)]
pub struct OrderStore {
    inner: Arc<Mutex<HashMap<String, Order>>>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order: Order) {
        let mut map = self.inner.lock().expect("order store mutex poisoned");
        map.insert(order.order_id.clone(), order);
    }

    pub fn get(&self, order_id: &str) -> Option<Order> {
        let map = self.inner.lock().expect("order store mutex poisoned");
        map.get(order_id).cloned()
    }

    pub fn contains(&self, order_id: &str) -> bool {
        let map = self.inner.lock().expect("order store mutex poisoned");
        map.contains_key(order_id)
    }

    /// Check-and-set of the `processed` flag. Two racing confirmations can
    /// never both observe `processed == false`: the whole read-modify-write
    /// happens under the lock, and the loser gets `AlreadyProcessed`.
    pub fn settle(
        &self,
        order_id: &str,
        decision: Decision,
        payment_reference: Option<String>,
    ) -> Result<Settled, AppError> {
        let mut map = self.inner.lock().expect("order store mutex poisoned");

        let order = map
            .get_mut(order_id)
            .ok_or_else(|| AppError::OrderNotFound(order_id.to_string()))?;

        if order.processed {
            return Ok(Settled::AlreadyProcessed(order.clone()));
        }

        order.processed = true;
        order.payment_reference = payment_reference;
        match decision {
            Decision::Approved => {
                order.status = OrderStatus::Completed;
                order.paid_at = Some(Utc::now());
            }
            Decision::Declined => {
                order.status = OrderStatus::Failed;
            }
        }

        Ok(Settled::Applied(order.clone()))
    }
}
