//! Template Store
//!
//! Blank worksheet and report templates live in an external object
//! store, keyed by test item code. Lookup probes a short list of
//! candidate filenames under a type prefix; a miss is a normal outcome,
//! not an error. Network failures on one candidate are logged and the
//! probe moves on.

use std::time::Duration;

use crate::config::TemplateStoreConfig;
use crate::error::{LabError, LabResult};

#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub filename: String,
    pub content: Vec<u8>,
}

#[allow(async_fn_in_trait)]
pub trait TemplateStore: Clone + Send + Sync + 'static {
    /// Blank worksheet template for a test item, or None when the store
    /// has nothing under any candidate name.
    async fn worksheet_template(&self, item_code: &str) -> LabResult<Option<TemplateFile>>;

    /// Report template for a test item.
    async fn report_template(&self, item_code: &str) -> LabResult<Option<TemplateFile>>;
}

#[derive(Debug, Clone)]
pub struct HttpTemplateStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTemplateStore {
    pub fn new(config: &TemplateStoreConfig) -> LabResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LabError::template_store(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Candidate filenames in probe order, most specific first.
    fn candidates(item_code: &str, kind: &str) -> Vec<String> {
        let code = item_code.trim().to_uppercase().replace(' ', "_");
        vec![
            format!("{}_{}.xlsx", code, kind),
            format!("{}_{}.docx", code, kind),
            format!("{}.xlsx", code),
            format!("{}.docx", code),
        ]
    }

    async fn probe(&self, prefix: &str, names: Vec<String>) -> LabResult<Option<TemplateFile>> {
        for name in names {
            let url = format!("{}/{}/{}", self.base_url, prefix, name);
            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Template probe {} failed: {}", url, e);
                    continue;
                }
            };

            if response.status().is_success() {
                let content = response
                    .bytes()
                    .await
                    .map_err(|e| {
                        LabError::template_store(format!("Failed to read template body: {}", e))
                    })?
                    .to_vec();
                return Ok(Some(TemplateFile {
                    filename: name,
                    content,
                }));
            }
        }

        Ok(None)
    }
}

impl TemplateStore for HttpTemplateStore {
    async fn worksheet_template(&self, item_code: &str) -> LabResult<Option<TemplateFile>> {
        self.probe("worksheets", Self::candidates(item_code, "Worksheet"))
            .await
    }

    async fn report_template(&self, item_code: &str) -> LabResult<Option<TemplateFile>> {
        self.probe("reports", Self::candidates(item_code, "Report"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order() {
        let names = HttpTemplateStore::candidates("cbr", "Worksheet");
        assert_eq!(
            names,
            vec![
                "CBR_Worksheet.xlsx",
                "CBR_Worksheet.docx",
                "CBR.xlsx",
                "CBR.docx",
            ]
        );
    }

    #[test]
    fn test_candidates_normalize_code() {
        let names = HttpTemplateStore::candidates(" sieve analysis ", "Report");
        assert_eq!(names[0], "SIEVE_ANALYSIS_Report.xlsx");
    }
}
