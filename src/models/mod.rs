pub mod order;

pub use order::{Customer, Order, OrderStatus, PaymentMethod};
