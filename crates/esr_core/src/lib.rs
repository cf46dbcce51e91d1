pub mod analytics;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod insights;
pub mod metrics;
pub mod normalize;
pub mod registry;
pub mod report;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("CONFIG_NOT_FOUND", "config missing").with_details("path=x.yaml");
        assert_eq!(err.code, "CONFIG_NOT_FOUND");
        assert!(err.is_not_found());
        assert!(!err.retryable);
        assert_eq!(err.to_string(), "[CONFIG_NOT_FOUND] config missing (path=x.yaml)");
        assert!(!AppError::new("CONFIG_PARSE_FAILED", "bad").is_not_found());
    }
}
