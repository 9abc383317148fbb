pub mod app_config;
pub mod database;
pub mod pg_ledger;
pub mod pg_repo;

pub use database::DbClient;
pub use pg_ledger::PgLedger;
pub use pg_repo::PgRepository;
