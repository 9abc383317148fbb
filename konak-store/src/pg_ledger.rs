use async_trait::async_trait;
use konak_core::{CoreError, CoreResult, Record};
use konak_ledger::settlement::{self, LedgerError, SalesLedger, TransferReceipt, TransferRequest};
use konak_ledger::{AccommodationRecord, Sale};
use sqlx::PgPool;
use uuid::Uuid;

use crate::pg_repo::{delete_row, insert_row, lock_rows, remote, write_row};

/// Sales ledger over Postgres. Each operation runs in one transaction with the
/// affected stay rows locked, so concurrent transfers of the same stay serialize.
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalesLedger for PgLedger {
    async fn transfer_to_sales(&self, request: TransferRequest) -> CoreResult<TransferReceipt> {
        let mut tx = self.pool.begin().await.map_err(remote)?;
        let mut stays: Vec<AccommodationRecord> = lock_rows(&mut tx, &request.accommodation_ids).await?;

        let planned = settlement::plan_transfer(&stays, &request).map_err(|e| {
            tracing::warn!("transfer to sales rejected: {}", e);
            CoreError::from(e)
        })?;

        for sale in &planned {
            insert_row(&mut tx, sale).await?;
            if let Some(stay) = stays.iter_mut().find(|r| r.id == sale.accommodation_id) {
                stay.mark_transferred(sale.id);
                write_row(&mut tx, &*stay).await?;
            }
        }
        tx.commit().await.map_err(remote)?;

        settlement::announce_transfer(request.organization_name.trim(), &planned);
        Ok(TransferReceipt {
            success: true,
            sale_ids: planned.iter().map(|s| s.id).collect(),
        })
    }

    async fn delete_sale(&self, sale_id: Uuid, return_to_pool: bool) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(remote)?;
        let sale: Sale = lock_rows(&mut tx, &[sale_id])
            .await?
            .into_iter()
            .next()
            .ok_or(LedgerError::UnknownSale(sale_id))?;

        if return_to_pool {
            let stays: Vec<AccommodationRecord> = lock_rows(&mut tx, &[sale.accommodation_id]).await?;
            match stays.into_iter().next() {
                Some(mut stay) => {
                    stay.return_to_pool();
                    write_row(&mut tx, &stay).await?;
                }
                None => tracing::warn!(
                    sale_id = %sale.id,
                    accommodation_id = %sale.accommodation_id,
                    "source stay no longer exists"
                ),
            }
        }

        delete_row(&mut tx, Sale::KIND, sale.id).await?;
        tx.commit().await.map_err(remote)?;

        settlement::announce_sale_deleted(&sale, return_to_pool);
        Ok(())
    }
}
