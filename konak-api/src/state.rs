use std::sync::Arc;

use konak_catalog::Hotel;
use konak_core::{MemoryRepository, Repository, User};
use konak_dispatch::TransferOrder;
use konak_ledger::{AccommodationRecord, MemoryLedger, Sale, SalesLedger};
use konak_store::{DbClient, PgLedger, PgRepository};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct ListingConfig {
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_sizes: konak_core::query::PAGE_SIZE_CHOICES.to_vec(),
            default_page_size: 25,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub hotels: Arc<dyn Repository<Hotel>>,
    pub transfers: Arc<dyn Repository<TransferOrder>>,
    pub accommodations: Arc<dyn Repository<AccommodationRecord>>,
    pub sales: Arc<dyn Repository<Sale>>,
    pub users: Arc<dyn Repository<User>>,
    pub ledger: Arc<dyn SalesLedger>,
    pub auth: AuthConfig,
    pub listing: ListingConfig,
}

impl AppState {
    /// Everything in process memory; the ledger shares the stay and sale stores.
    pub fn in_memory(auth: AuthConfig, listing: ListingConfig) -> Self {
        let accommodations = Arc::new(MemoryRepository::new());
        let sales = Arc::new(MemoryRepository::new());
        let ledger = MemoryLedger::new(accommodations.clone(), sales.clone());

        Self {
            hotels: Arc::new(MemoryRepository::<Hotel>::new()),
            transfers: Arc::new(MemoryRepository::<TransferOrder>::new()),
            accommodations,
            sales,
            users: Arc::new(MemoryRepository::<User>::new()),
            ledger: Arc::new(ledger),
            auth,
            listing,
        }
    }

    pub fn postgres(db: &DbClient, auth: AuthConfig, listing: ListingConfig) -> Self {
        let pool = db.pool.clone();
        Self {
            hotels: Arc::new(PgRepository::<Hotel>::new(pool.clone())),
            transfers: Arc::new(PgRepository::<TransferOrder>::new(pool.clone())),
            accommodations: Arc::new(PgRepository::<AccommodationRecord>::new(pool.clone())),
            sales: Arc::new(PgRepository::<Sale>::new(pool.clone())),
            users: Arc::new(PgRepository::<User>::new(pool.clone())),
            ledger: Arc::new(PgLedger::new(pool)),
            auth,
            listing,
        }
    }
}
