// Mobile-money payments: signed gateway calls, orders, webhook reconciliation.
// All gateway traffic goes through gateway.rs.

pub mod gateway;
pub mod handlers;
pub mod models;
pub mod orders;
pub mod phone;
pub mod replay;
pub mod signing;
pub mod webhook;
