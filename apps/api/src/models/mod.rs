pub mod document;
pub mod payment;
