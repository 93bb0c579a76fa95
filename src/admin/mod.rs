pub mod dto;
pub mod maintenance;
pub mod services;

pub use services::AdminReconciler;
