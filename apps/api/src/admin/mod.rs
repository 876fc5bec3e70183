// Back-office endpoints guarded by the static admin bearer token.

pub mod auth;
pub mod handlers;
