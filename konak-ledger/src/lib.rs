pub mod accommodation;
pub mod aggregation;
pub mod finance;
pub mod sale;
pub mod settlement;

pub use accommodation::{
    AccommodationDraft, AccommodationError, AccommodationRecord, BoardType, StayStatus,
    ACCOMMODATION_SEARCH_FIELDS,
};
pub use aggregation::{GroupSummary, NetMargin};
pub use finance::{AccommodationSummary, FinanceSummary};
pub use sale::{Sale, SaleStatus, SALE_SEARCH_FIELDS};
pub use settlement::{LedgerError, MemoryLedger, SalesLedger, TransferReceipt, TransferRequest};
