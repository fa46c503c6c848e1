/// Delivery services
pub mod health;
pub mod sender;
pub mod transport;
