//! WooCommerce store connections and product mappings.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde::Serialize;
use uuid::Uuid;

use super::mapper::map_product;
use crate::application::dto::request::{ConnectStoreRequest, UpdateMappingRequest};
use crate::config::WooCommerceSettings;
use crate::domain::{
    CompanyRepository, ProductMappingRepository, WooCommerceProductMapping, WooCommerceStore,
    WooStoreRepository,
};
use crate::infrastructure::repositories::{
    PgCompanyRepository, PgProductMappingRepository, PgWooStoreRepository,
};
use crate::infrastructure::woocommerce::{WooClientError, WooClientFactory};
use crate::shared::error::{AppError, FieldError};

/// Outcome of pulling the product catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductSyncReport {
    pub store_id: Uuid,
    pub pages: u32,
    pub upserted: u32,
    /// More pages were available than the per-run limit allows.
    pub truncated: bool,
}

/// Store service trait.
#[async_trait]
pub trait StoreService: Send + Sync {
    /// Verify credentials and save the connection.
    async fn connect(
        &self,
        scope: Option<Uuid>,
        request: ConnectStoreRequest,
    ) -> Result<WooCommerceStore, StoreError>;

    async fn list(&self, company_id: Uuid) -> Result<Vec<WooCommerceStore>, StoreError>;

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<WooCommerceStore, StoreError>;

    async fn disconnect(&self, id: Uuid, scope: Option<Uuid>) -> Result<(), StoreError>;

    async fn sync_products(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<ProductSyncReport, StoreError>;

    async fn list_mappings(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<Vec<WooCommerceProductMapping>, StoreError>;

    async fn update_mapping(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        mapping_id: Uuid,
        request: UpdateMappingRequest,
    ) -> Result<WooCommerceProductMapping, StoreError>;
}

/// Store service errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store not found")]
    NotFound,

    #[error("Company not found")]
    CompanyNotFound,

    #[error("Product mapping not found")]
    MappingNotFound,

    #[error("Store is already connected")]
    AlreadyConnected,

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid WooCommerce credentials")]
    InvalidCredentials,

    #[error("WooCommerce REST API not found at this URL")]
    ApiNotFound,

    #[error("Store request failed: {0}")]
    Upstream(#[from] WooClientError),

    #[error("Invalid request")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound | StoreError::CompanyNotFound | StoreError::MappingNotFound => {
                AppError::NotFound(err.to_string())
            }
            StoreError::AlreadyConnected => AppError::Conflict(err.to_string()),
            StoreError::InvalidCredentials | StoreError::ApiNotFound => {
                AppError::Unprocessable(err.to_string())
            }
            StoreError::InvalidUrl(_) => AppError::from_field_errors(vec![FieldError::new(
                "store_url",
                err.to_string(),
            )]),
            StoreError::Upstream(_) => AppError::Upstream(err.to_string()),
            StoreError::Invalid(errors) => AppError::from_field_errors(errors),
            StoreError::Repository(e) => e,
        }
    }
}

/// Canonical store URL: http(s) with a host, no query, no trailing slash.
pub fn normalize_store_url(raw: &str) -> Result<String, StoreError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StoreError::InvalidUrl("scheme must be http or https".into()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(StoreError::InvalidUrl("host is required".into()));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Store service implementation.
pub struct StoreServiceImpl<W, P, C>
where
    W: WooStoreRepository,
    P: ProductMappingRepository,
    C: CompanyRepository,
{
    store_repo: Arc<W>,
    mapping_repo: Arc<P>,
    company_repo: Arc<C>,
    woo: Arc<dyn WooClientFactory>,
    settings: WooCommerceSettings,
}

impl<W, P, C> StoreServiceImpl<W, P, C>
where
    W: WooStoreRepository,
    P: ProductMappingRepository,
    C: CompanyRepository,
{
    pub fn new(
        store_repo: Arc<W>,
        mapping_repo: Arc<P>,
        company_repo: Arc<C>,
        woo: Arc<dyn WooClientFactory>,
        settings: WooCommerceSettings,
    ) -> Self {
        Self {
            store_repo,
            mapping_repo,
            company_repo,
            woo,
            settings,
        }
    }

    async fn load(&self, id: Uuid, scope: Option<Uuid>) -> Result<WooCommerceStore, StoreError> {
        self.store_repo
            .find_by_id(id)
            .await?
            .filter(|s| scope.map_or(true, |company| s.company_id == company))
            .ok_or(StoreError::NotFound)
    }

    async fn load_active(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<WooCommerceStore, StoreError> {
        let store = self.load(id, scope).await?;
        if !store.is_active {
            return Err(StoreError::NotFound);
        }
        Ok(store)
    }
}

#[async_trait]
impl<W, P, C> StoreService for StoreServiceImpl<W, P, C>
where
    W: WooStoreRepository + 'static,
    P: ProductMappingRepository + 'static,
    C: CompanyRepository + 'static,
{
    #[tracing::instrument(skip(self, request), fields(store_url = %request.store_url))]
    async fn connect(
        &self,
        scope: Option<Uuid>,
        request: ConnectStoreRequest,
    ) -> Result<WooCommerceStore, StoreError> {
        let company_id = scope.or(request.company_id).ok_or_else(|| {
            StoreError::Invalid(vec![FieldError::new("company_id", "is required")])
        })?;
        let store_url = normalize_store_url(&request.store_url)?;

        self.company_repo
            .find_by_id(company_id)
            .await?
            .filter(|c| !c.is_deleted)
            .ok_or(StoreError::CompanyNotFound)?;

        if self
            .store_repo
            .active_url_exists(company_id, &store_url)
            .await?
        {
            return Err(StoreError::AlreadyConnected);
        }

        let now = Utc::now();
        let store = WooCommerceStore {
            id: Uuid::now_v7(),
            company_id,
            name: request.name.trim().to_string(),
            store_url,
            consumer_key: request.consumer_key.trim().to_string(),
            consumer_secret: request.consumer_secret.trim().to_string(),
            webhook_secret: WooCommerceStore::generate_webhook_secret(),
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };

        // One order is enough to prove the keys can read orders.
        match self.woo.for_store(&store).fetch_orders(1, 1, None).await {
            Ok(_) => {}
            Err(WooClientError::Unauthorized) => return Err(StoreError::InvalidCredentials),
            Err(WooClientError::NotFound) => return Err(StoreError::ApiNotFound),
            Err(e) => return Err(StoreError::Upstream(e)),
        }

        let created = self.store_repo.create(&store).await.map_err(|e| match e {
            AppError::Conflict(_) => StoreError::AlreadyConnected,
            other => StoreError::Repository(other),
        })?;

        tracing::info!(store_id = %created.id, company_id = %company_id, "WooCommerce store connected");
        Ok(created)
    }

    async fn list(&self, company_id: Uuid) -> Result<Vec<WooCommerceStore>, StoreError> {
        Ok(self.store_repo.list_by_company(company_id).await?)
    }

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<WooCommerceStore, StoreError> {
        self.load(id, scope).await
    }

    async fn disconnect(&self, id: Uuid, scope: Option<Uuid>) -> Result<(), StoreError> {
        let store = self.load(id, scope).await?;
        if store.is_active {
            self.store_repo.deactivate(id).await?;
            tracing::info!(store_id = %id, "WooCommerce store disconnected");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn sync_products(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<ProductSyncReport, StoreError> {
        let store = self.load_active(id, scope).await?;
        let client = self.woo.for_store(&store);

        let mut report = ProductSyncReport {
            store_id: id,
            ..Default::default()
        };
        let mut page = 1;
        loop {
            let batch = client.fetch_products(page, self.settings.per_page).await?;
            report.pages += 1;

            for product in &batch.items {
                self.mapping_repo.upsert(&map_product(id, product)).await?;
                report.upserted += 1;
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

        tracing::info!(
            store_id = %id,
            pages = report.pages,
            upserted = report.upserted,
            truncated = report.truncated,
            "Product catalogue synced"
        );
        Ok(report)
    }

    async fn list_mappings(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<Vec<WooCommerceProductMapping>, StoreError> {
        self.load(id, scope).await?;
        Ok(self.mapping_repo.list_by_store(id).await?)
    }

    async fn update_mapping(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        mapping_id: Uuid,
        request: UpdateMappingRequest,
    ) -> Result<WooCommerceProductMapping, StoreError> {
        self.load(id, scope).await?;
        let mut mapping = self
            .mapping_repo
            .find_by_id(mapping_id)
            .await?
            .filter(|m| m.store_id == id)
            .ok_or(StoreError::MappingNotFound)?;

        if let Some(weight) = request.weight_grams {
            mapping.weight_grams = Some(weight);
        }
        if let Some(length) = request.length_cm {
            mapping.length_cm = Some(length);
        }
        if let Some(breadth) = request.breadth_cm {
            mapping.breadth_cm = Some(breadth);
        }
        if let Some(height) = request.height_cm {
            mapping.height_cm = Some(height);
        }
        mapping.updated_at = Utc::now();

        Ok(self.mapping_repo.update_dimensions(&mapping).await?)
    }
}

/// Concrete implementation using PostgreSQL repositories.
pub type PgStoreService =
    StoreServiceImpl<PgWooStoreRepository, PgProductMappingRepository, PgCompanyRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Address, Company, CompanyStatus, MockCompanyRepository, MockProductMappingRepository,
        MockWooStoreRepository,
    };
    use crate::infrastructure::woocommerce::{
        MockWooClientFactory, MockWooCommerceApi, Page, WooProduct,
    };
    use test_case::test_case;

    fn settings() -> WooCommerceSettings {
        WooCommerceSettings {
            request_timeout_secs: 5,
            per_page: 2,
            max_pages: 2,
            user_agent: "test".into(),
        }
    }

    fn company(id: Uuid) -> Company {
        let now = Utc::now();
        Company {
            id,
            name: "Chai Co".into(),
            legal_name: "Chai Co LLP".into(),
            email: "hi@chai.example".into(),
            phone: "9845012345".into(),
            gstin: None,
            billing_address: Address::default(),
            status: CompanyStatus::Active,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn store(company_id: Uuid) -> WooCommerceStore {
        let now = Utc::now();
        WooCommerceStore {
            id: Uuid::now_v7(),
            company_id,
            name: "Chai Co".into(),
            store_url: "https://chai.example".into(),
            consumer_key: "ck_abcdef".into(),
            consumer_secret: "cs_abcdef".into(),
            webhook_secret: "secret".into(),
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn connect_request(url: &str) -> ConnectStoreRequest {
        ConnectStoreRequest {
            company_id: None,
            name: "Chai Co".into(),
            store_url: url.into(),
            consumer_key: " ck_abcdef ".into(),
            consumer_secret: "cs_abcdef".into(),
        }
    }

    fn factory_with(result: fn() -> Result<(), WooClientError>) -> MockWooClientFactory {
        let mut woo = MockWooClientFactory::new();
        woo.expect_for_store().returning(move |_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_fetch_orders()
                .withf(|page, per_page, after| *page == 1 && *per_page == 1 && after.is_none())
                .returning(move |_, _, _| {
                    result().map(|_| Page {
                        items: vec![],
                        total: 0,
                        total_pages: 0,
                    })
                });
            Arc::new(api)
        });
        woo
    }

    fn service(
        stores: MockWooStoreRepository,
        mappings: MockProductMappingRepository,
        companies: MockCompanyRepository,
        woo: MockWooClientFactory,
    ) -> StoreServiceImpl<MockWooStoreRepository, MockProductMappingRepository, MockCompanyRepository>
    {
        StoreServiceImpl::new(
            Arc::new(stores),
            Arc::new(mappings),
            Arc::new(companies),
            Arc::new(woo),
            settings(),
        )
    }

    fn companies() -> MockCompanyRepository {
        let mut repo = MockCompanyRepository::new();
        repo.expect_find_by_id().returning(|id| Ok(Some(company(id))));
        repo
    }

    #[test_case("https://Shop.Example.com/" => Ok("https://shop.example.com".to_string()))]
    #[test_case("http://shop.example.com/store/?x=1" => Ok("http://shop.example.com/store".to_string()))]
    #[test_case("https://shop.example.com:8443" => Ok("https://shop.example.com:8443".to_string()))]
    fn normalizes_urls(raw: &str) -> Result<String, String> {
        normalize_store_url(raw).map_err(|e| e.to_string())
    }

    #[test_case("ftp://shop.example.com")]
    #[test_case("shop.example.com")]
    #[test_case("")]
    fn rejects_urls(raw: &str) {
        assert!(matches!(
            normalize_store_url(raw),
            Err(StoreError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn connect_verifies_and_saves() {
        let mut stores = MockWooStoreRepository::new();
        stores
            .expect_active_url_exists()
            .withf(|_, url| url.to_string() == "https://chai.example")
            .returning(|_, _| Ok(false));
        stores.expect_create().returning(|s| Ok(s.clone()));

        let store = service(
            stores,
            MockProductMappingRepository::new(),
            companies(),
            factory_with(|| Ok(())),
        )
        .connect(Some(Uuid::now_v7()), connect_request("https://chai.example/"))
        .await
        .unwrap();

        assert_eq!(store.consumer_key, "ck_abcdef");
        assert_eq!(store.webhook_secret.len(), 32);
        assert_eq!(store.masked_consumer_key(), "*****cdef");
    }

    #[tokio::test]
    async fn wrong_keys_are_unprocessable() {
        let mut stores = MockWooStoreRepository::new();
        stores.expect_active_url_exists().returning(|_, _| Ok(false));
        stores.expect_create().never();

        let err = service(
            stores,
            MockProductMappingRepository::new(),
            companies(),
            factory_with(|| Err(WooClientError::Unauthorized)),
        )
        .connect(Some(Uuid::now_v7()), connect_request("https://chai.example"))
        .await
        .unwrap_err();

        assert!(matches!(err, StoreError::InvalidCredentials));
        assert!(matches!(AppError::from(err), AppError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn duplicate_connection_is_conflict() {
        let mut stores = MockWooStoreRepository::new();
        stores.expect_active_url_exists().returning(|_, _| Ok(true));

        let err = service(
            stores,
            MockProductMappingRepository::new(),
            companies(),
            MockWooClientFactory::new(),
        )
        .connect(Some(Uuid::now_v7()), connect_request("https://chai.example"))
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyConnected));
    }

    #[tokio::test]
    async fn product_sync_pages_until_limit() {
        let s = store(Uuid::now_v7());
        let store_id = s.id;
        let mut stores = MockWooStoreRepository::new();
        stores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(s.clone())));

        let mut woo = MockWooClientFactory::new();
        woo.expect_for_store().returning(|_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_fetch_products().times(2).returning(|page, _| {
                Ok(Page {
                    items: vec![
                        WooProduct {
                            id: page as i64 * 10,
                            weight: "0.5".into(),
                            ..Default::default()
                        },
                        WooProduct {
                            id: page as i64 * 10 + 1,
                            ..Default::default()
                        },
                    ],
                    total: 10,
                    total_pages: 5,
                })
            });
            Arc::new(api)
        });

        let mut mappings = MockProductMappingRepository::new();
        mappings
            .expect_upsert()
            .times(4)
            .returning(|m| Ok(m.clone()));

        let report = service(stores, mappings, MockCompanyRepository::new(), woo)
            .sync_products(store_id, None)
            .await
            .unwrap();

        assert_eq!(
            report,
            ProductSyncReport {
                store_id,
                pages: 2,
                upserted: 4,
                truncated: true,
            }
        );
    }

    #[tokio::test]
    async fn mapping_of_other_store_is_hidden() {
        let s = store(Uuid::now_v7());
        let store_id = s.id;
        let mut stores = MockWooStoreRepository::new();
        stores
            .expect_find_by_id()
            .returning(move |_| Ok(Some(s.clone())));
        let mut mappings = MockProductMappingRepository::new();
        mappings.expect_find_by_id().returning(|id| {
            let mut m = map_product(Uuid::now_v7(), &WooProduct::default());
            m.id = id;
            Ok(Some(m))
        });
        mappings.expect_update_dimensions().never();

        let err = service(stores, mappings, MockCompanyRepository::new(), MockWooClientFactory::new())
            .update_mapping(store_id, None, Uuid::now_v7(), UpdateMappingRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MappingNotFound));
    }
}
