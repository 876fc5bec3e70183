// CV and cover letter documents: wizard content, lifecycle, exports.

pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod progress;
pub mod render;
pub mod store;
pub mod templates;
