pub mod quotations;
pub mod registry;
pub mod reports;
pub mod requests;
pub mod samples;
pub mod worksheets;

pub use quotations::QuotationRepository;
pub use registry::{ClientRepository, EnquiryRepository, ProjectRepository};
pub use reports::{NewReportFile, ReportRepository, ReportWithSample};
pub use requests::TestRequestRepository;
pub use samples::{NewSample, SampleRepository};
pub use worksheets::WorksheetRepository;
