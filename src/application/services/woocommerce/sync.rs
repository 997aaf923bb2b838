//! Idempotent storefront order synchronization.
//!
//! Both the pull sync and webhook deliveries funnel every order through
//! [`OrderSyncService::upsert_external_order`], so replaying the same order
//! any number of times leaves one row with the newest data.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mapper::{map_order, map_product, MapError, ProductLookup};
use crate::config::WooCommerceSettings;
use crate::domain::{
    OrderRepository, OrderStatus, ProductMappingRepository, ShipmentRepository, UpsertOutcome,
    WooCommerceStore, WooStoreRepository,
};
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::{
    PgOrderRepository, PgProductMappingRepository, PgShipmentRepository, PgWooStoreRepository,
};
use crate::infrastructure::woocommerce::{WooClientError, WooClientFactory, WooOrder, WooProduct};
use crate::shared::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Every order in the store.
    Full,
    /// Orders modified since the last successful run.
    #[default]
    Incremental,
}

/// One order that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub external_id: i64,
    pub reason: String,
}

/// Summary of a sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub store_id: Uuid,
    pub mode: SyncMode,
    pub pages: u32,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub failures: Vec<SyncFailure>,
    /// A page could not be fetched; later pages were not attempted.
    pub partial: bool,
    /// The page limit was reached before the last page.
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    fn new(store_id: Uuid, mode: SyncMode, started_at: DateTime<Utc>) -> Self {
        Self {
            store_id,
            mode,
            pages: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            failed: 0,
            failures: Vec::new(),
            partial: false,
            truncated: false,
            error: None,
            started_at,
            finished_at: started_at,
        }
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Sync service errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Store not found")]
    StoreNotFound,

    #[error(transparent)]
    Map(#[from] MapError),

    #[error("Store request failed: {0}")]
    Client(#[from] WooClientError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl SyncError {
    /// Whether retrying the same input can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Map(_) | SyncError::StoreNotFound => false,
            SyncError::Client(WooClientError::Unauthorized | WooClientError::NotFound) => false,
            SyncError::Repository(e) => e.is_server_error(),
            SyncError::Client(_) => true,
        }
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::StoreNotFound => AppError::NotFound(err.to_string()),
            SyncError::Map(_) => AppError::Unprocessable(err.to_string()),
            SyncError::Client(_) => AppError::Upstream(err.to_string()),
            SyncError::Repository(e) => e,
        }
    }
}

/// Storefront synchronization service trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderSyncService: Send + Sync {
    /// Pull orders from the store.
    async fn sync_store(
        &self,
        store_id: Uuid,
        scope: Option<Uuid>,
        mode: SyncMode,
    ) -> Result<SyncReport, SyncError>;

    /// Insert or last-write-wins update of one storefront order.
    async fn upsert_external_order(
        &self,
        store: &WooCommerceStore,
        woo: &WooOrder,
    ) -> Result<UpsertOutcome, SyncError>;

    /// Mark a deleted storefront order cancelled. False when unknown.
    async fn cancel_external_order(
        &self,
        store: &WooCommerceStore,
        external_id: i64,
    ) -> Result<bool, SyncError>;

    async fn apply_product(
        &self,
        store: &WooCommerceStore,
        product: &WooProduct,
    ) -> Result<(), SyncError>;

    async fn remove_product(
        &self,
        store: &WooCommerceStore,
        product_id: i64,
    ) -> Result<(), SyncError>;

    /// Active store by id, for background jobs.
    async fn active_store(&self, store_id: Uuid) -> Result<Option<WooCommerceStore>, SyncError>;
}

/// Sync service implementation.
pub struct OrderSyncServiceImpl<W, O, P, S>
where
    W: WooStoreRepository,
    O: OrderRepository,
    P: ProductMappingRepository,
    S: ShipmentRepository,
{
    store_repo: Arc<W>,
    order_repo: Arc<O>,
    mapping_repo: Arc<P>,
    shipment_repo: Arc<S>,
    woo: Arc<dyn WooClientFactory>,
    settings: WooCommerceSettings,
}

impl<W, O, P, S> OrderSyncServiceImpl<W, O, P, S>
where
    W: WooStoreRepository,
    O: OrderRepository,
    P: ProductMappingRepository,
    S: ShipmentRepository,
{
    pub fn new(
        store_repo: Arc<W>,
        order_repo: Arc<O>,
        mapping_repo: Arc<P>,
        shipment_repo: Arc<S>,
        woo: Arc<dyn WooClientFactory>,
        settings: WooCommerceSettings,
    ) -> Self {
        Self {
            store_repo,
            order_repo,
            mapping_repo,
            shipment_repo,
            woo,
            settings,
        }
    }

    async fn product_lookup(
        &self,
        store_id: Uuid,
        woo: &WooOrder,
    ) -> Result<ProductLookup, SyncError> {
        let mut product_ids: Vec<i64> = woo
            .line_items
            .iter()
            .map(|line| line.product_id)
            .filter(|id| *id != 0)
            .collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        if product_ids.is_empty() {
            return Ok(ProductLookup::default());
        }
        let mappings = self
            .mapping_repo
            .find_for_products(store_id, &product_ids)
            .await?;
        Ok(ProductLookup::new(mappings))
    }

    /// Log shipments left running under a cancelled order.
    async fn warn_live_shipments(&self, store: &WooCommerceStore, external_id: i64) {
        let order = match self.order_repo.find_by_external_id(store.id, external_id).await {
            Ok(Some(order)) => order,
            _ => return,
        };
        match self.shipment_repo.find_live_by_order(order.id).await {
            Ok(live) if !live.is_empty() => {
                tracing::warn!(
                    store_id = %store.id,
                    external_id,
                    order_id = %order.id,
                    shipments = live.len(),
                    "Storefront cancelled an order with live shipments"
                );
            }
            _ => {}
        }
    }
}

#[async_trait]
impl<W, O, P, S> OrderSyncService for OrderSyncServiceImpl<W, O, P, S>
where
    W: WooStoreRepository + 'static,
    O: OrderRepository + 'static,
    P: ProductMappingRepository + 'static,
    S: ShipmentRepository + 'static,
{
    #[tracing::instrument(skip(self))]
    async fn sync_store(
        &self,
        store_id: Uuid,
        scope: Option<Uuid>,
        mode: SyncMode,
    ) -> Result<SyncReport, SyncError> {
        let store = self
            .store_repo
            .find_by_id(store_id)
            .await?
            .filter(|s| s.is_active)
            .filter(|s| scope.map_or(true, |company| s.company_id == company))
            .ok_or(SyncError::StoreNotFound)?;

        let started_at = Utc::now();
        let modified_after = match mode {
            SyncMode::Full => None,
            SyncMode::Incremental => store.last_synced_at,
        };
        let client = self.woo.for_store(&store);
        let mut report = SyncReport::new(store_id, mode, started_at);
        // Newest modification time fully processed, oldest-first ordering.
        let mut checkpoint: Option<DateTime<Utc>> = None;

        let mut page = 1;
        loop {
            let batch = match client
                .fetch_orders(page, self.settings.per_page, modified_after)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(store_id = %store_id, page, error = %e, "Order page fetch failed");
                    report.partial = true;
                    report.error = Some(e.to_string());
                    break;
                }
            };
            report.pages += 1;

            for woo in &batch.items {
                match self.upsert_external_order(&store, woo).await {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        tracing::warn!(
                            store_id = %store_id,
                            external_id = woo.id,
                            error = %e,
                            "Order sync failed"
                        );
                        metrics::record_order_synced("failed");
                        report.failed += 1;
                        report.failures.push(SyncFailure {
                            external_id: woo.id,
                            reason: e.to_string(),
                        });
                    }
                }
                if let Some(at) = woo.modified_at() {
                    checkpoint = Some(checkpoint.map_or(at, |c| c.max(at)));
                }
            }

            if page >= batch.total_pages || batch.items.is_empty() {
                break;
            }
            if page >= self.settings.max_pages {
                report.truncated = true;
                break;
            }
            page += 1;
        }

        let advance_to = if report.partial {
            None
        } else if report.truncated {
            checkpoint
        } else {
            Some(started_at)
        };
        if let Some(at) = advance_to {
            self.store_repo.set_last_synced_at(store_id, at).await?;
        }

        report.finished_at = Utc::now();
        tracing::info!(
            store_id = %store_id,
            mode = ?mode,
            pages = report.pages,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            partial = report.partial,
            "Order sync finished"
        );
        Ok(report)
    }

    async fn upsert_external_order(
        &self,
        store: &WooCommerceStore,
        woo: &WooOrder,
    ) -> Result<UpsertOutcome, SyncError> {
        let lookup = self.product_lookup(store.id, woo).await?;
        let order = map_order(store, woo, &lookup)?;
        let outcome = self.order_repo.upsert_external(&order).await?;

        metrics::record_order_synced(outcome.as_str());
        tracing::debug!(
            store_id = %store.id,
            external_id = woo.id,
            outcome = outcome.as_str(),
            "Storefront order upserted"
        );

        if outcome == UpsertOutcome::Updated && order.status == OrderStatus::Cancelled {
            self.warn_live_shipments(store, woo.id).await;
        }
        Ok(outcome)
    }

    async fn cancel_external_order(
        &self,
        store: &WooCommerceStore,
        external_id: i64,
    ) -> Result<bool, SyncError> {
        let Some(order) = self
            .order_repo
            .find_by_external_id(store.id, external_id)
            .await?
        else {
            tracing::debug!(store_id = %store.id, external_id, "Deleted order was never synced");
            return Ok(false);
        };

        if order.status != OrderStatus::Cancelled {
            self.order_repo
                .update_status(order.id, OrderStatus::Cancelled)
                .await?;
            tracing::info!(store_id = %store.id, external_id, order_id = %order.id, "Storefront order deleted");
            self.warn_live_shipments(store, external_id).await;
        }
        Ok(true)
    }

    async fn apply_product(
        &self,
        store: &WooCommerceStore,
        product: &WooProduct,
    ) -> Result<(), SyncError> {
        self.mapping_repo
            .upsert(&map_product(store.id, product))
            .await?;
        Ok(())
    }

    async fn remove_product(
        &self,
        store: &WooCommerceStore,
        product_id: i64,
    ) -> Result<(), SyncError> {
        let removed = self
            .mapping_repo
            .delete_product(store.id, product_id)
            .await?;
        tracing::debug!(store_id = %store.id, product_id, removed, "Product mappings removed");
        Ok(())
    }

    async fn active_store(&self, store_id: Uuid) -> Result<Option<WooCommerceStore>, SyncError> {
        Ok(self
            .store_repo
            .find_by_id(store_id)
            .await?
            .filter(|s| s.is_active))
    }
}

/// Concrete implementation using PostgreSQL repositories.
pub type PgOrderSyncService = OrderSyncServiceImpl<
    PgWooStoreRepository,
    PgOrderRepository,
    PgProductMappingRepository,
    PgShipmentRepository,
>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockOrderRepository, MockProductMappingRepository, MockShipmentRepository,
        MockWooStoreRepository,
    };
    use crate::infrastructure::woocommerce::{
        MockWooClientFactory, MockWooCommerceApi, Page, WooLineItem,
    };
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    struct Mocks {
        stores: MockWooStoreRepository,
        orders: MockOrderRepository,
        mappings: MockProductMappingRepository,
        shipments: MockShipmentRepository,
        woo: MockWooClientFactory,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                stores: MockWooStoreRepository::new(),
                orders: MockOrderRepository::new(),
                mappings: MockProductMappingRepository::new(),
                shipments: MockShipmentRepository::new(),
                woo: MockWooClientFactory::new(),
            }
        }

        fn build(
            self,
            max_pages: u32,
        ) -> OrderSyncServiceImpl<
            MockWooStoreRepository,
            MockOrderRepository,
            MockProductMappingRepository,
            MockShipmentRepository,
        > {
            OrderSyncServiceImpl::new(
                Arc::new(self.stores),
                Arc::new(self.orders),
                Arc::new(self.mappings),
                Arc::new(self.shipments),
                Arc::new(self.woo),
                WooCommerceSettings {
                    request_timeout_secs: 5,
                    per_page: 2,
                    max_pages,
                    user_agent: "test".into(),
                },
            )
        }
    }

    fn store(last_synced_at: Option<DateTime<Utc>>) -> WooCommerceStore {
        let now = Utc::now();
        WooCommerceStore {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            name: "Chai Co".into(),
            store_url: "https://chai.example".into(),
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            webhook_secret: "s".into(),
            is_active: true,
            last_synced_at,
            created_at: now,
            updated_at: now,
        }
    }

    fn woo_order(id: i64, minute: u32) -> WooOrder {
        WooOrder {
            id,
            status: "processing".into(),
            total: "100.00".into(),
            date_modified_gmt: Some(format!("2026-03-01T10:{:02}:00", minute)),
            line_items: vec![WooLineItem {
                product_id: 7,
                quantity: 1,
                subtotal: "100.00".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn page(items: Vec<WooOrder>, total_pages: u32) -> Page<WooOrder> {
        Page {
            total: items.len() as u64,
            items,
            total_pages,
        }
    }

    #[tokio::test]
    async fn incremental_sync_counts_and_advances_clock() {
        let last = Utc::now() - Duration::hours(1);
        let s = store(Some(last));
        let store_id = s.id;

        let mut mocks = Mocks::new();
        mocks
            .stores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(s.clone())));
        mocks.woo.expect_for_store().returning(move |_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_fetch_orders()
                .withf(move |_, _, after| *after == Some(last))
                .returning(|n, _, _| match n {
                    1 => Ok(page(vec![woo_order(1, 0), woo_order(2, 1)], 2)),
                    _ => Ok(page(vec![woo_order(3, 2)], 2)),
                });
            Arc::new(api)
        });
        mocks
            .mappings
            .expect_find_for_products()
            .returning(|_, _| Ok(vec![]));
        mocks.orders.expect_upsert_external().returning(|o| {
            Ok(match o.external_id {
                Some(1) => UpsertOutcome::Created,
                Some(2) => UpsertOutcome::Skipped,
                _ => UpsertOutcome::Updated,
            })
        });
        mocks
            .stores
            .expect_set_last_synced_at()
            .times(1)
            .returning(|_, _| Ok(()));

        let report = mocks
            .build(10)
            .sync_store(store_id, None, SyncMode::Incremental)
            .await
            .unwrap();

        assert_eq!(report.pages, 2);
        assert_eq!((report.created, report.skipped, report.updated), (1, 1, 1));
        assert!(!report.partial);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn bad_order_is_recorded_and_sync_continues() {
        let s = store(None);
        let store_id = s.id;

        let mut mocks = Mocks::new();
        mocks
            .stores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(s.clone())));
        mocks.woo.expect_for_store().returning(|_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_fetch_orders().returning(|_, _, _| {
                let mut broken = woo_order(2, 1);
                broken.total = "12,00".into();
                Ok(page(vec![woo_order(1, 0), broken], 1))
            });
            Arc::new(api)
        });
        mocks
            .mappings
            .expect_find_for_products()
            .returning(|_, _| Ok(vec![]));
        mocks
            .orders
            .expect_upsert_external()
            .times(1)
            .returning(|_| Ok(UpsertOutcome::Created));
        mocks
            .stores
            .expect_set_last_synced_at()
            .times(1)
            .returning(|_, _| Ok(()));

        let report = mocks
            .build(10)
            .sync_store(store_id, None, SyncMode::Full)
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].external_id, 2);
        assert!(report.failures[0].reason.contains("total"));
    }

    #[tokio::test]
    async fn page_error_is_partial_and_keeps_clock() {
        let s = store(None);
        let store_id = s.id;

        let mut mocks = Mocks::new();
        mocks
            .stores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(s.clone())));
        mocks.woo.expect_for_store().returning(|_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_fetch_orders().returning(|n, _, _| match n {
                1 => Ok(page(vec![woo_order(1, 0)], 3)),
                _ => Err(WooClientError::RateLimited),
            });
            Arc::new(api)
        });
        mocks
            .mappings
            .expect_find_for_products()
            .returning(|_, _| Ok(vec![]));
        mocks
            .orders
            .expect_upsert_external()
            .returning(|_| Ok(UpsertOutcome::Created));
        mocks.stores.expect_set_last_synced_at().never();

        let report = mocks
            .build(10)
            .sync_store(store_id, None, SyncMode::Full)
            .await
            .unwrap();

        assert!(report.partial);
        assert_eq!(report.pages, 1);
        assert!(report.error.is_some());
    }

    #[tokio::test]
    async fn truncated_run_checkpoints_at_last_order() {
        let s = store(None);
        let store_id = s.id;
        let saved = Arc::new(Mutex::new(None));
        let saved_in_mock = saved.clone();

        let mut mocks = Mocks::new();
        mocks
            .stores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(s.clone())));
        mocks.woo.expect_for_store().returning(|_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_fetch_orders()
                .times(1)
                .returning(|_, _, _| Ok(page(vec![woo_order(1, 5), woo_order(2, 9)], 4)));
            Arc::new(api)
        });
        mocks
            .mappings
            .expect_find_for_products()
            .returning(|_, _| Ok(vec![]));
        mocks
            .orders
            .expect_upsert_external()
            .returning(|_| Ok(UpsertOutcome::Created));
        mocks
            .stores
            .expect_set_last_synced_at()
            .returning(move |_, at| {
                *saved_in_mock.lock().unwrap() = Some(at);
                Ok(())
            });

        let report = mocks
            .build(1)
            .sync_store(store_id, None, SyncMode::Full)
            .await
            .unwrap();

        assert!(report.truncated);
        assert_eq!(
            *saved.lock().unwrap(),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 10, 9, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn deleted_order_is_cancelled_once() {
        let s = store(None);
        let mut mocks = Mocks::new();
        mocks.orders.expect_find_by_external_id().returning(|store_id, external_id| {
            let mut order = map_order(
                &store(None),
                &woo_order(external_id, 0),
                &ProductLookup::default(),
            )
            .unwrap();
            order.store_id = Some(store_id);
            Ok(Some(order))
        });
        mocks
            .orders
            .expect_update_status()
            .withf(|_, status| *status == OrderStatus::Cancelled)
            .times(1)
            .returning(|_, _| Ok(()));
        mocks
            .shipments
            .expect_find_live_by_order()
            .returning(|_| Ok(vec![]));

        assert!(mocks.build(1).cancel_external_order(&s, 42).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_deleted_order_is_noop() {
        let s = store(None);
        let mut mocks = Mocks::new();
        mocks
            .orders
            .expect_find_by_external_id()
            .returning(|_, _| Ok(None));
        mocks.orders.expect_update_status().never();

        assert!(!mocks.build(1).cancel_external_order(&s, 42).await.unwrap());
    }

    #[test]
    fn mapping_errors_are_not_retryable() {
        let err = SyncError::Map(MapError::InvalidAmount {
            field: "total",
            value: "x".into(),
        });
        assert!(!err.is_retryable());
        assert!(!SyncError::Map(MapError::WeightOutOfRange { line: 3 }).is_retryable());
        assert!(SyncError::Client(WooClientError::RateLimited).is_retryable());
        assert!(SyncError::Repository(AppError::Internal("db".into())).is_retryable());
        assert!(!SyncError::Repository(AppError::Conflict("dup".into())).is_retryable());
    }
}
