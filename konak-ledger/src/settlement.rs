use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use konak_core::{BulkOutcome, CoreError, CoreResult, MemoryRepository};
use konak_shared::events::{self, AccommodationsTransferredEvent, SaleDeletedEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accommodation::AccommodationRecord;
use crate::sale::Sale;

#[derive(Debug, Clone, Deserialize)]
pub struct TransferRequest {
    pub accommodation_ids: Vec<Uuid>,
    pub organization_name: String,
    pub unit_prices: HashMap<Uuid, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReceipt {
    pub success: bool,
    pub sale_ids: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("No accommodation records selected")]
    EmptySelection,

    #[error("Accommodation {0} does not exist")]
    UnknownRecord(Uuid),

    #[error("Accommodation {0} was already transferred to sales")]
    AlreadyTransferred(Uuid),

    #[error("Accommodation {0} has no organization")]
    MissingOrganization(Uuid),

    #[error("Selected records belong to more than one organization: {0:?}")]
    MixedOrganizations(Vec<String>),

    #[error("Selected records belong to {found}, not {requested}")]
    OrganizationMismatch { requested: String, found: String },

    #[error("Accommodation {0} needs a price greater than zero")]
    NonPositivePrice(Uuid),

    #[error("Sale {0} does not exist")]
    UnknownSale(Uuid),
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownRecord(_) | LedgerError::UnknownSale(_) => CoreError::NotFound(err.to_string()),
            LedgerError::AlreadyTransferred(_) => CoreError::Conflict(err.to_string()),
            _ => CoreError::Validation(err.to_string()),
        }
    }
}

/// Checks a transfer request against the current stays and builds the sales it would create.
///
/// All-or-nothing: any failing record rejects the whole batch and nothing is built.
pub fn plan_transfer(records: &[AccommodationRecord], request: &TransferRequest) -> Result<Vec<Sale>, LedgerError> {
    let mut seen = HashSet::new();
    let ids: Vec<Uuid> = request
        .accommodation_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if ids.is_empty() {
        return Err(LedgerError::EmptySelection);
    }

    let mut selected = Vec::with_capacity(ids.len());
    for id in &ids {
        let record = records
            .iter()
            .find(|r| r.id == *id)
            .ok_or(LedgerError::UnknownRecord(*id))?;
        if record.transferred {
            return Err(LedgerError::AlreadyTransferred(*id));
        }
        selected.push(record);
    }

    let mut organizations: Vec<String> = Vec::new();
    for record in &selected {
        let name = record
            .organization_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(LedgerError::MissingOrganization(record.id))?;
        if !organizations.iter().any(|o| o == name) {
            organizations.push(name.to_string());
        }
    }
    if organizations.len() > 1 {
        return Err(LedgerError::MixedOrganizations(organizations));
    }
    let organization = organizations.remove(0);
    let requested = request.organization_name.trim();
    if requested != organization {
        return Err(LedgerError::OrganizationMismatch {
            requested: requested.to_string(),
            found: organization,
        });
    }

    selected
        .into_iter()
        .map(|record| match request.unit_prices.get(&record.id) {
            Some(price) if *price > Decimal::ZERO => Ok(Sale::for_stay(record, &organization, *price)),
            _ => Err(LedgerError::NonPositivePrice(record.id)),
        })
        .collect()
}

/// Moves stays into the sales ledger and back.
#[async_trait]
pub trait SalesLedger: Send + Sync {
    async fn transfer_to_sales(&self, request: TransferRequest) -> CoreResult<TransferReceipt>;

    /// Removes a sale. With `return_to_pool` the source stay becomes editable again.
    async fn delete_sale(&self, sale_id: Uuid, return_to_pool: bool) -> CoreResult<()>;

    /// Runs `delete_sale` for each distinct id. One sale failing never stops the rest.
    async fn delete_sales(&self, sale_ids: &[Uuid], return_to_pool: bool) -> CoreResult<BulkOutcome> {
        if sale_ids.is_empty() {
            return Err(CoreError::validation("no sales selected"));
        }

        let mut outcome = BulkOutcome::default();
        let mut seen = HashSet::new();
        for &id in sale_ids.iter().filter(|id| seen.insert(**id)) {
            match self.delete_sale(id, return_to_pool).await {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => outcome.fail(id, e),
            }
        }

        tracing::info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            return_to_pool,
            "bulk sale deletion finished"
        );
        Ok(outcome)
    }
}

pub fn announce_transfer(organization_name: &str, sales: &[Sale]) {
    tracing::info!(
        organization = organization_name,
        count = sales.len(),
        "accommodations transferred to sales"
    );
    let event = AccommodationsTransferredEvent {
        organization_name: organization_name.to_string(),
        accommodation_ids: sales.iter().map(|s| s.accommodation_id).collect(),
        sale_ids: sales.iter().map(|s| s.id).collect(),
        timestamp: events::now_ts(),
    };
    events::publish(events::TOPIC_SALES, organization_name, &event);
}

pub fn announce_sale_deleted(sale: &Sale, returned_to_pool: bool) {
    tracing::info!(sale_id = %sale.id, returned_to_pool, "sale deleted");
    let event = SaleDeletedEvent {
        sale_id: sale.id,
        accommodation_id: sale.accommodation_id,
        returned_to_pool,
        timestamp: events::now_ts(),
    };
    events::publish(events::TOPIC_SALES, &sale.id.to_string(), &event);
}

/// Ledger over the in-memory repositories. Both stores are held for the whole
/// operation, stays first, so a transfer is never half applied.
pub struct MemoryLedger {
    accommodations: Arc<MemoryRepository<AccommodationRecord>>,
    sales: Arc<MemoryRepository<Sale>>,
}

impl MemoryLedger {
    pub fn new(
        accommodations: Arc<MemoryRepository<AccommodationRecord>>,
        sales: Arc<MemoryRepository<Sale>>,
    ) -> Self {
        Self { accommodations, sales }
    }
}

#[async_trait]
impl SalesLedger for MemoryLedger {
    async fn transfer_to_sales(&self, request: TransferRequest) -> CoreResult<TransferReceipt> {
        let mut stays = self.accommodations.write().await;
        let mut sales = self.sales.write().await;

        let planned = plan_transfer(&stays, &request).map_err(|e| {
            tracing::warn!("transfer to sales rejected: {}", e);
            CoreError::from(e)
        })?;

        for sale in &planned {
            if let Some(stay) = stays.iter_mut().find(|r| r.id == sale.accommodation_id) {
                stay.mark_transferred(sale.id);
            }
        }
        sales.extend(planned.iter().cloned());

        announce_transfer(request.organization_name.trim(), &planned);
        Ok(TransferReceipt {
            success: true,
            sale_ids: planned.iter().map(|s| s.id).collect(),
        })
    }

    async fn delete_sale(&self, sale_id: Uuid, return_to_pool: bool) -> CoreResult<()> {
        let mut stays = self.accommodations.write().await;
        let mut sales = self.sales.write().await;

        let idx = sales
            .iter()
            .position(|s| s.id == sale_id)
            .ok_or(LedgerError::UnknownSale(sale_id))?;
        let sale = sales.remove(idx);

        if return_to_pool {
            if let Some(stay) = stays.iter_mut().find(|r| r.id == sale.accommodation_id) {
                stay.return_to_pool();
            } else {
                tracing::warn!(sale_id = %sale.id, accommodation_id = %sale.accommodation_id, "source stay no longer exists");
            }
        }

        announce_sale_deleted(&sale, return_to_pool);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accommodation::tests::draft;
    use konak_core::Repository;
    use rust_decimal_macros::dec;

    fn stay(guest: &str, org: Option<&str>) -> AccommodationRecord {
        AccommodationRecord::from_draft(draft(guest, org, (6, 15), (6, 18), dec!(1000))).unwrap()
    }

    fn request(records: &[&AccommodationRecord], org: &str, price: Decimal) -> TransferRequest {
        TransferRequest {
            accommodation_ids: records.iter().map(|r| r.id).collect(),
            organization_name: org.to_string(),
            unit_prices: records.iter().map(|r| (r.id, price)).collect(),
        }
    }

    #[test]
    fn test_mixed_organizations_rejected() {
        let a = stay("Ayşe", Some("Acme"));
        let b = stay("Burak", Some("Beta"));
        let records = vec![a.clone(), b.clone()];

        let err = plan_transfer(&records, &request(&[&a, &b], "Acme", dec!(1200))).unwrap_err();
        assert!(matches!(err, LedgerError::MixedOrganizations(ref orgs) if orgs.len() == 2));
    }

    #[test]
    fn test_every_record_needs_a_positive_price() {
        let a = stay("Ayşe", Some("Acme"));
        let b = stay("Burak", Some("Acme"));
        let records = vec![a.clone(), b.clone()];

        let mut req = request(&[&a, &b], "Acme", dec!(1200));
        req.unit_prices.insert(b.id, Decimal::ZERO);
        assert!(matches!(plan_transfer(&records, &req), Err(LedgerError::NonPositivePrice(id)) if id == b.id));

        req.unit_prices.remove(&b.id);
        assert!(matches!(plan_transfer(&records, &req), Err(LedgerError::NonPositivePrice(_))));
    }

    #[test]
    fn test_organization_rules() {
        let a = stay("Ayşe", Some("Acme"));
        let loose = stay("Cem", None);
        let records = vec![a.clone(), loose.clone()];

        assert!(matches!(
            plan_transfer(&records, &request(&[&loose], "Acme", dec!(5))),
            Err(LedgerError::MissingOrganization(_))
        ));
        assert!(matches!(
            plan_transfer(&records, &request(&[&a], "Other", dec!(5))),
            Err(LedgerError::OrganizationMismatch { .. })
        ));
        assert!(matches!(
            plan_transfer(&records, &request(&[], "Acme", dec!(5))),
            Err(LedgerError::EmptySelection)
        ));
    }

    #[tokio::test]
    async fn test_transfer_locks_and_delete_returns_to_pool() {
        let a = stay("Ayşe", Some("Acme"));
        let b = stay("Burak", Some("Acme"));
        let stays = Arc::new(MemoryRepository::with_records(vec![a.clone(), b.clone()]));
        let sales = Arc::new(MemoryRepository::new());
        let ledger = MemoryLedger::new(stays.clone(), sales.clone());

        let receipt = ledger.transfer_to_sales(request(&[&a, &b], " Acme ", dec!(1500))).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.sale_ids.len(), 2);

        let stored = stays.get(a.id).await.unwrap().unwrap();
        assert!(stored.transferred);
        assert_eq!(stored.version, 2);
        let sale = sales.get(receipt.sale_ids[0]).await.unwrap().unwrap();
        assert_eq!(sale.total_amount, dec!(4500));

        let again = ledger.transfer_to_sales(request(&[&a], "Acme", dec!(1500))).await;
        assert!(matches!(again, Err(CoreError::Conflict(_))));

        ledger.delete_sale(receipt.sale_ids[0], true).await.unwrap();
        ledger.delete_sale(receipt.sale_ids[1], false).await.unwrap();
        assert!(!stays.get(a.id).await.unwrap().unwrap().transferred);
        assert!(stays.get(b.id).await.unwrap().unwrap().transferred);
        assert!(sales.list().await.unwrap().is_empty());

        let missing = ledger.delete_sale(Uuid::new_v4(), true).await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bulk_delete_unlocks_every_stay() {
        let a = stay("Ayşe", Some("Acme"));
        let b = stay("Burak", Some("Acme"));
        let stays = Arc::new(MemoryRepository::with_records(vec![a.clone(), b.clone()]));
        let sales = Arc::new(MemoryRepository::new());
        let ledger = MemoryLedger::new(stays.clone(), sales.clone());

        let receipt = ledger.transfer_to_sales(request(&[&a, &b], "Acme", dec!(1500))).await.unwrap();
        let missing = Uuid::new_v4();
        let ids = [receipt.sale_ids[0], missing, receipt.sale_ids[1], receipt.sale_ids[0]];

        let outcome = ledger.delete_sales(&ids, true).await.unwrap();
        assert_eq!((outcome.succeeded, outcome.failed), (2, 1));
        assert_eq!(outcome.failures[0].id, missing);
        assert!(sales.list().await.unwrap().is_empty());
        for stored in stays.list().await.unwrap() {
            assert!(!stored.transferred);
            assert_eq!(stored.sale_id, None);
        }

        assert!(matches!(ledger.delete_sales(&[], true).await, Err(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejected_batch_changes_nothing() {
        let a = stay("Ayşe", Some("Acme"));
        let b = stay("Burak", Some("Beta"));
        let stays = Arc::new(MemoryRepository::with_records(vec![a.clone(), b.clone()]));
        let sales = Arc::new(MemoryRepository::new());
        let ledger = MemoryLedger::new(stays.clone(), sales.clone());

        let err = ledger.transfer_to_sales(request(&[&a, &b], "Acme", dec!(1))).await;
        assert!(matches!(err, Err(CoreError::Validation(_))));
        assert!(sales.list().await.unwrap().is_empty());
        assert!(stays.list().await.unwrap().iter().all(|r| !r.transferred));
    }
}
