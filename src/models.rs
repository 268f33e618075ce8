pub mod activity;
pub mod analytics;
pub mod batch;
pub mod department;
pub mod extraction;
pub mod receipt;
