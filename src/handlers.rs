pub mod activity;
pub mod analytics;
pub mod batches;
pub mod departments;
pub mod receipts;
