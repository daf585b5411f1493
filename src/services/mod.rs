pub mod auth_service;
pub mod captcha_solver;
pub mod credential_service;
pub mod report_service;
pub mod scrape_service;

pub use auth_service::AuthService;
pub use captcha_solver::CaptchaSolver;
pub use credential_service::CredentialResolver;
pub use report_service::ReportService;
pub use scrape_service::ScrapeService;
