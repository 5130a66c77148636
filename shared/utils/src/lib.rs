pub mod allocation;
pub mod config;
pub mod error;
pub mod logging;
pub mod numbering;
pub mod storage;
pub mod templates;
pub mod validation;

pub use allocation::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use storage::*;
pub use templates::*;
pub use validation::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_loading() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_error_handling() {
        let error = LabError::validation("quantity", "must be at least 1");
        assert_eq!(error.error_code(), "VALIDATION_ERROR");
        assert_eq!(error.http_status_code(), 400);
    }
}
