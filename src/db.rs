pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod analytics_repo;
pub use analytics_repo::AnalyticsRepository;
pub mod batch_repo;
pub use batch_repo::BatchRepository;
pub mod department_repo;
pub use department_repo::DepartmentRepository;
pub mod receipt_repo;
pub use receipt_repo::ReceiptRepository;
