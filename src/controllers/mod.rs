pub mod home_controller;
pub mod orders_controller;
pub mod payments_controller;
