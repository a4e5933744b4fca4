// [libs/infra/store/src/repositories/mod.rs]
pub mod accounts;
pub mod analyses;
pub mod dispatch_records;
pub mod posts;
pub mod settings;

pub use accounts::AccountRepository;
pub use analyses::AnalysisRepository;
pub use dispatch_records::DispatchRecordRepository;
pub use posts::PostRepository;
pub use settings::SettingRepository;
