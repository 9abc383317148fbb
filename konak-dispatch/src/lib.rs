pub mod transfer;

pub use transfer::{
    BillingParty, ManualAssignment, Passenger, TransferDraft, TransferError, TransferOrder, TransferStatus,
    TRANSFER_SEARCH_FIELDS,
};
