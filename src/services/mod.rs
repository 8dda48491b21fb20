pub mod pricing;
pub mod gateway;

pub mod order_service;
pub mod payment_service;
pub mod email_service;
pub mod crm_service;
