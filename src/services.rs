pub mod activity_service;
pub mod analytics_service;
pub mod batch_service;
pub mod department_service;
pub mod extraction_service;
pub mod receipt_service;
pub mod storage_service;

#[cfg(test)]
pub(crate) mod test_support;
