//! Report Cover Sheet Renderer
//!
//! Handlebars rendering of the populated report template: a field map
//! (report number, date, request, covered samples, project and client
//! details) merged into a registered template. The document internals
//! stay opaque to the rest of the service.

use handlebars::Handlebars;
use serde::Serialize;

use terralab_utils::{LabError, LabResult};

const COVER_SHEET_TEMPLATE: &str = r#"
<!DOCTYPE html>
<html>
<head><style>body{font-family:Arial,sans-serif;color:#222;}.head{border-bottom:2px solid #222;padding:12px 0;}.meta{margin:16px 0;}.meta td{padding:4px 12px 4px 0;}.samples{margin-top:12px;}</style></head>
<body>
<div class="head"><h2>Test Report {{report_no}}</h2><p>{{report_date}}</p></div>
<table class="meta">
<tr><td>Test Request</td><td>{{request_no}}</td></tr>
<tr><td>Project</td><td>{{project_name}}</td></tr>
<tr><td>Client</td><td>{{client_name}}</td></tr>
<tr><td>Location</td><td>{{location}}</td></tr>
<tr><td>Test</td><td>{{test_name}}</td></tr>
<tr><td>Standard</td><td>{{test_standard}}</td></tr>
</table>
<div class="samples">
<h3>Samples Covered</h3>
<ul>
{{#each sample_numbers}}<li>{{this}}</li>{{/each}}
</ul>
</div>
</body>
</html>
"#;

/// Field map for the cover sheet.
#[derive(Debug, Clone, Serialize)]
pub struct CoverSheetContext {
    pub report_no: String,
    pub report_date: String,
    pub request_no: String,
    pub project_name: String,
    pub client_name: String,
    pub location: String,
    pub test_name: String,
    pub test_standard: String,
    pub sample_numbers: Vec<String>,
}

pub struct DocumentRenderer {
    handlebars: Handlebars<'static>,
}

impl DocumentRenderer {
    pub fn new() -> LabResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars
            .register_template_string("cover_sheet", COVER_SHEET_TEMPLATE)
            .map_err(|e| LabError::rendering(format!("Failed to register template: {}", e)))?;

        Ok(Self { handlebars })
    }

    pub fn render_cover_sheet(&self, context: &CoverSheetContext) -> LabResult<String> {
        self.handlebars
            .render("cover_sheet", context)
            .map_err(|e| LabError::rendering(format!("Failed to render cover sheet: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CoverSheetContext {
        CoverSheetContext {
            report_no: "GR - 121225 - 001".to_string(),
            report_date: "2025-12-12".to_string(),
            request_no: "GQ-121225-01".to_string(),
            project_name: "Ring Road Extension".to_string(),
            client_name: "Gulf Soils".to_string(),
            location: "Zone 14".to_string(),
            test_name: "California Bearing Ratio".to_string(),
            test_standard: "ASTM D1883".to_string(),
            sample_numbers: vec!["GS-121225-01-1".to_string(), "GS-121225-01-2".to_string()],
        }
    }

    #[test]
    fn test_cover_sheet_renders_fields() {
        let renderer = DocumentRenderer::new().unwrap();
        let html = renderer.render_cover_sheet(&context()).unwrap();

        assert!(html.contains("GR - 121225 - 001"));
        assert!(html.contains("GQ-121225-01"));
        assert!(html.contains("GS-121225-01-2"));
        assert!(html.contains("ASTM D1883"));
    }

    #[test]
    fn test_cover_sheet_lists_every_sample() {
        let renderer = DocumentRenderer::new().unwrap();
        let mut ctx = context();
        ctx.sample_numbers = (1..=5).map(|n| format!("GS-121225-01-{}", n)).collect();

        let html = renderer.render_cover_sheet(&ctx).unwrap();
        for n in 1..=5 {
            assert!(html.contains(&format!("GS-121225-01-{}", n)));
        }
    }
}
