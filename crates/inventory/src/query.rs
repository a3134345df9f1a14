//! Read-side queries over the stock store.
//!
//! Queries never mutate and never retry; they report whatever is committed
//! at the moment of the read.

use stock_store::{MovementRecord, StockStore, DEFAULT_HISTORY_LIMIT};

use crate::error::InventoryError;
use crate::service::InventoryService;
use crate::view::StockInfo;
use crate::ProductId;

impl<S: StockStore> InventoryService<S> {
    /// Returns the current stock position for a product.
    #[tracing::instrument(skip(self))]
    pub async fn get_stock(&self, product_id: ProductId) -> Result<StockInfo, InventoryError> {
        let aggregate = self
            .store()
            .get_aggregate(product_id)
            .await?
            .ok_or(InventoryError::NotFound(product_id))?;
        Ok(StockInfo::from(&aggregate))
    }

    /// Returns the most recent ledger entries for a product, newest first.
    ///
    /// `limit` defaults to [`DEFAULT_HISTORY_LIMIT`]. An existing product
    /// with no movements yields an empty list; an unknown product is an
    /// error.
    #[tracing::instrument(skip(self))]
    pub async fn get_movement_history(
        &self,
        product_id: ProductId,
        limit: Option<usize>,
    ) -> Result<Vec<MovementRecord>, InventoryError> {
        if self.store().get_aggregate(product_id).await?.is_none() {
            return Err(InventoryError::NotFound(product_id));
        }
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let movements = self.store().movements_for_product(product_id, limit).await?;
        Ok(movements)
    }

    /// Lists every active product whose available stock is at or below its
    /// reorder threshold.
    #[tracing::instrument(skip(self))]
    pub async fn get_low_stock_products(&self) -> Result<Vec<StockInfo>, InventoryError> {
        let aggregates = self.store().list_active_aggregates().await?;
        Ok(aggregates
            .iter()
            .filter(|a| a.is_low_stock())
            .map(StockInfo::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stock_store::{InMemoryStockStore, MovementType, NewStockAggregate, StockStore};

    async fn service() -> InventoryService<InMemoryStockStore> {
        InventoryService::new(InMemoryStockStore::new())
    }

    async fn add_product(
        service: &InventoryService<InMemoryStockStore>,
        stock: i64,
        threshold: i64,
        active: bool,
    ) -> ProductId {
        let product_id = ProductId::new();
        service
            .store()
            .create_aggregate(
                NewStockAggregate::new(product_id)
                    .stock(stock)
                    .low_stock_threshold(threshold)
                    .active(active),
            )
            .await
            .unwrap();
        product_id
    }

    #[tokio::test]
    async fn get_stock_reports_derived_fields() {
        let service = service().await;
        let product_id = add_product(&service, 10, 3, true).await;
        service.reserve_stock(product_id, 4, None).await.unwrap();

        let info = service.get_stock(product_id).await.unwrap();
        assert_eq!(info.stock, 10);
        assert_eq!(info.reserved_stock, 4);
        assert_eq!(info.available_stock, 6);
        assert!(!info.is_low_stock);
    }

    #[tokio::test]
    async fn get_stock_is_read_only() {
        let service = service().await;
        let product_id = add_product(&service, 10, 3, true).await;

        let first = service.get_stock(product_id).await.unwrap();
        let second = service.get_stock(product_id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.store().movement_count().await, 0);
    }

    #[tokio::test]
    async fn get_stock_unknown_product_not_found() {
        let service = service().await;
        let err = service.get_stock(ProductId::new()).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_bounded() {
        let service = service().await;
        let product_id = add_product(&service, 0, 0, true).await;
        for i in 1..=4 {
            service
                .adjust_stock(product_id, i, MovementType::Restock, None, None)
                .await
                .unwrap();
        }

        let history = service
            .get_movement_history(product_id, Some(3))
            .await
            .unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].quantity, 4);
        assert_eq!(history[2].quantity, 2);
    }

    #[tokio::test]
    async fn history_for_fresh_product_is_empty() {
        let service = service().await;
        let product_id = add_product(&service, 10, 0, true).await;

        let history = service.get_movement_history(product_id, None).await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn history_for_unknown_product_not_found() {
        let service = service().await;
        let err = service
            .get_movement_history(ProductId::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn low_stock_listing_uses_inclusive_threshold() {
        let service = service().await;
        // available 3, threshold 3: listed.
        let at_threshold = add_product(&service, 3, 3, true).await;
        // available 4, threshold 3: not listed.
        let above = add_product(&service, 4, 3, true).await;

        let low = service.get_low_stock_products().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, at_threshold);
        assert!(low[0].is_low_stock);
        assert!(!low.iter().any(|info| info.product_id == above));
    }

    #[tokio::test]
    async fn low_stock_listing_counts_reservations() {
        let service = service().await;
        let product_id = add_product(&service, 10, 3, true).await;

        assert!(service.get_low_stock_products().await.unwrap().is_empty());

        // Reservations reduce availability into the threshold.
        service.reserve_stock(product_id, 7, None).await.unwrap();
        let low = service.get_low_stock_products().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].available_stock, 3);
    }

    #[tokio::test]
    async fn low_stock_listing_skips_inactive_products() {
        let service = service().await;
        add_product(&service, 0, 5, false).await;
        let active = add_product(&service, 0, 5, true).await;

        let low = service.get_low_stock_products().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, active);
    }
}
