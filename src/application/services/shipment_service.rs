//! Shipment Service
//!
//! Booking shipments against orders, AWB assignment and tracking updates.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

use crate::application::dto::request::CreateShipmentRequest;
use crate::application::services::woocommerce::map_outbound_status;
use crate::domain::services::RateCalculator;
use crate::domain::{
    is_valid_pincode, CompanyRepository, CourierRepository, NonServiceableReason, Order,
    OrderChannel, OrderRepository, Parcel, Shipment, ShipmentFilter, ShipmentRepository,
    ShipmentStatus, WooStoreRepository,
};
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::{
    PgCompanyRepository, PgCourierRepository, PgOrderRepository, PgShipmentRepository,
    PgWooStoreRepository,
};
use crate::infrastructure::woocommerce::WooClientFactory;
use crate::shared::error::{AppError, FieldError};
use crate::shared::pagination::{Paginated, Pagination};

/// Maximum attempts to find an unused AWB number.
const MAX_AWB_ATTEMPTS: usize = 5;

/// Random digits after the courier prefix.
const AWB_DIGITS: u32 = 10;

/// Shipment service trait.
#[async_trait]
pub trait ShipmentService: Send + Sync {
    async fn create(
        &self,
        scope: Option<Uuid>,
        request: CreateShipmentRequest,
    ) -> Result<Shipment, ShipmentError>;

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<Shipment, ShipmentError>;

    async fn list(
        &self,
        filter: ShipmentFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Shipment>, ShipmentError>;

    /// Apply a tracking update.
    async fn update_status(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        next: ShipmentStatus,
    ) -> Result<Shipment, ShipmentError>;

    async fn cancel(&self, id: Uuid, scope: Option<Uuid>) -> Result<Shipment, ShipmentError>;
}

/// Shipment service errors.
#[derive(Debug, thiserror::Error)]
pub enum ShipmentError {
    #[error("Shipment not found")]
    NotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Courier not found")]
    CourierNotFound,

    #[error("Company not found")]
    CompanyNotFound,

    #[error("Company is not active")]
    CompanyInactive,

    #[error("Order is {0} and cannot be shipped")]
    OrderClosed(String),

    #[error("Order already has an active shipment")]
    AlreadyShipped,

    #[error("Courier cannot carry this shipment: {0}")]
    NotServiceable(NonServiceableReason),

    #[error("Cannot move shipment from {from} to {to}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("Shipment status is managed through manifests")]
    ManifestManaged,

    #[error("Could not allocate a unique AWB number")]
    AwbExhausted,

    #[error("Invalid shipment")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<ShipmentError> for AppError {
    fn from(err: ShipmentError) -> Self {
        match err {
            ShipmentError::NotFound
            | ShipmentError::OrderNotFound
            | ShipmentError::CourierNotFound
            | ShipmentError::CompanyNotFound => AppError::NotFound(err.to_string()),
            ShipmentError::AlreadyShipped
            | ShipmentError::InvalidTransition { .. }
            | ShipmentError::ManifestManaged => AppError::Conflict(err.to_string()),
            ShipmentError::CompanyInactive
            | ShipmentError::OrderClosed(_)
            | ShipmentError::NotServiceable(_) => AppError::Unprocessable(err.to_string()),
            ShipmentError::AwbExhausted => AppError::Internal(err.to_string()),
            ShipmentError::Invalid(errors) => AppError::from_field_errors(errors),
            ShipmentError::Repository(e) => e,
        }
    }
}

/// `{prefix}{10 random digits}`
pub fn generate_awb(prefix: &str) -> String {
    let n: u64 = rand::rng().random_range(0..10u64.pow(AWB_DIGITS));
    format!("{}{:0width$}", prefix, n, width = AWB_DIGITS as usize)
}

/// Shipment service implementation.
pub struct ShipmentServiceImpl<S, O, C, Co, W>
where
    S: ShipmentRepository,
    O: OrderRepository,
    C: CourierRepository,
    Co: CompanyRepository,
    W: WooStoreRepository,
{
    shipment_repo: Arc<S>,
    order_repo: Arc<O>,
    courier_repo: Arc<C>,
    company_repo: Arc<Co>,
    store_repo: Arc<W>,
    woo: Arc<dyn WooClientFactory>,
}

impl<S, O, C, Co, W> ShipmentServiceImpl<S, O, C, Co, W>
where
    S: ShipmentRepository,
    O: OrderRepository,
    C: CourierRepository,
    Co: CompanyRepository,
    W: WooStoreRepository,
{
    pub fn new(
        shipment_repo: Arc<S>,
        order_repo: Arc<O>,
        courier_repo: Arc<C>,
        company_repo: Arc<Co>,
        store_repo: Arc<W>,
        woo: Arc<dyn WooClientFactory>,
    ) -> Self {
        Self {
            shipment_repo,
            order_repo,
            courier_repo,
            company_repo,
            store_repo,
            woo,
        }
    }

    async fn load(&self, id: Uuid, scope: Option<Uuid>) -> Result<Shipment, ShipmentError> {
        self.shipment_repo
            .find_by_id(id)
            .await?
            .filter(|s| scope.map_or(true, |company| s.company_id == company))
            .ok_or(ShipmentError::NotFound)
    }

    async fn insert_with_awb(
        &self,
        mut shipment: Shipment,
        prefix: &str,
    ) -> Result<Shipment, ShipmentError> {
        for _ in 0..MAX_AWB_ATTEMPTS {
            let awb = generate_awb(prefix);
            if self.shipment_repo.awb_exists(&awb).await? {
                continue;
            }
            shipment.awb = Some(awb);
            match self.shipment_repo.create(&shipment).await {
                Ok(created) => return Ok(created),
                // Lost a race for the same number.
                Err(AppError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(ShipmentError::AwbExhausted)
    }

    /// Tell the storefront about a delivered or cancelled shipment.
    ///
    /// Failures are logged and never surface to the caller.
    async fn push_storefront_status(&self, shipment: &Shipment, status: ShipmentStatus) {
        let Some(woo_status) = map_outbound_status(status) else {
            return;
        };
        if let Err(e) = self.try_push(shipment, woo_status).await {
            tracing::warn!(
                shipment_id = %shipment.id,
                order_id = %shipment.order_id,
                error = %e,
                "Failed to update storefront order status"
            );
        }
    }

    async fn try_push(&self, shipment: &Shipment, woo_status: &str) -> Result<(), AppError> {
        let Some(order) = self.order_repo.find_by_id(shipment.order_id).await? else {
            return Ok(());
        };
        let (Some(store_id), Some(external_id)) = (order.store_id, order.external_id) else {
            return Ok(());
        };
        if order.channel != OrderChannel::WooCommerce {
            return Ok(());
        }
        let Some(store) = self
            .store_repo
            .find_by_id(store_id)
            .await?
            .filter(|s| s.is_active)
        else {
            return Ok(());
        };

        self.woo
            .for_store(&store)
            .update_order_status(external_id, woo_status)
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        tracing::info!(
            store_id = %store.id,
            external_id,
            status = woo_status,
            "Storefront order status updated"
        );
        Ok(())
    }
}

fn ensure_shippable(order: &Order) -> Result<(), ShipmentError> {
    if order.status.is_closed() {
        return Err(ShipmentError::OrderClosed(order.status.to_string()));
    }
    Ok(())
}

#[async_trait]
impl<S, O, C, Co, W> ShipmentService for ShipmentServiceImpl<S, O, C, Co, W>
where
    S: ShipmentRepository + 'static,
    O: OrderRepository + 'static,
    C: CourierRepository + 'static,
    Co: CompanyRepository + 'static,
    W: WooStoreRepository + 'static,
{
    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create(
        &self,
        scope: Option<Uuid>,
        request: CreateShipmentRequest,
    ) -> Result<Shipment, ShipmentError> {
        let order = self
            .order_repo
            .find_by_id(request.order_id)
            .await?
            .filter(|o| scope.map_or(true, |company| o.company_id == company))
            .ok_or(ShipmentError::OrderNotFound)?;
        ensure_shippable(&order)?;

        if self.shipment_repo.has_live_shipment(order.id).await? {
            return Err(ShipmentError::AlreadyShipped);
        }

        let company = self
            .company_repo
            .find_by_id(order.company_id)
            .await?
            .ok_or(ShipmentError::CompanyNotFound)?;
        if !company.is_active() {
            return Err(ShipmentError::CompanyInactive);
        }

        let courier = self
            .courier_repo
            .find_by_id(request.courier_id)
            .await?
            .ok_or(ShipmentError::CourierNotFound)?;

        let pickup_pincode = request
            .pickup_pincode
            .map(|p| p.trim().to_string())
            .unwrap_or_else(|| company.billing_address.pincode.clone());
        if !is_valid_pincode(&pickup_pincode) {
            return Err(ShipmentError::Invalid(vec![FieldError::new(
                "pickup_pincode",
                "must be a 6-digit pincode",
            )]));
        }

        let parcel = Parcel {
            weight_grams: request.weight_grams.unwrap_or(order.weight_grams),
            length_cm: request.length_cm,
            breadth_cm: request.breadth_cm,
            height_cm: request.height_cm,
        };

        courier
            .check_serviceability(
                &pickup_pincode,
                &order.shipping_address.pincode,
                order.payment_mode,
                parcel.weight_grams,
            )
            .map_err(ShipmentError::NotServiceable)?;

        let cod_amount = order.collectable_amount();
        let quote = RateCalculator::quote(&courier, &parcel, order.payment_mode, cod_amount);

        let now = Utc::now();
        let shipment = Shipment {
            id: Uuid::now_v7(),
            company_id: order.company_id,
            order_id: order.id,
            courier_id: courier.id,
            awb: None,
            status: ShipmentStatus::AwbAssigned,
            payment_mode: order.payment_mode,
            cod_amount,
            weight_grams: parcel.weight_grams,
            length_cm: parcel.length_cm,
            breadth_cm: parcel.breadth_cm,
            height_cm: parcel.height_cm,
            freight_charge: quote.freight_charge,
            cod_charge: quote.cod_charge,
            manifest_id: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.insert_with_awb(shipment, &courier.awb_prefix).await?;
        metrics::record_shipment_transition(created.status.as_str());

        tracing::info!(
            shipment_id = %created.id,
            awb = created.awb.as_deref().unwrap_or_default(),
            courier = %courier.code,
            total_charge = created.total_charge(),
            "Shipment booked"
        );
        Ok(created)
    }

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<Shipment, ShipmentError> {
        self.load(id, scope).await
    }

    async fn list(
        &self,
        filter: ShipmentFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Shipment>, ShipmentError> {
        let (shipments, total) = self.shipment_repo.list(&filter, pagination).await?;
        Ok(Paginated::new(shipments, total, pagination))
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        next: ShipmentStatus,
    ) -> Result<Shipment, ShipmentError> {
        if matches!(next, ShipmentStatus::Manifested | ShipmentStatus::AwbAssigned) {
            return Err(ShipmentError::ManifestManaged);
        }

        let mut shipment = self.load(id, scope).await?;
        let current = shipment.status;
        if !current.can_transition_to(next) {
            return Err(ShipmentError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        if !self.shipment_repo.update_status(id, current, next).await? {
            // Someone else moved it first; report against the fresh state.
            let latest = self.load(id, scope).await?;
            return Err(ShipmentError::InvalidTransition {
                from: latest.status,
                to: next,
            });
        }

        metrics::record_shipment_transition(next.as_str());
        tracing::info!(shipment_id = %id, from = %current, to = %next, "Shipment status updated");

        shipment.status = next;
        shipment.updated_at = Utc::now();
        if next == ShipmentStatus::Cancelled {
            shipment.manifest_id = None;
        }

        self.push_storefront_status(&shipment, next).await;
        Ok(shipment)
    }

    async fn cancel(&self, id: Uuid, scope: Option<Uuid>) -> Result<Shipment, ShipmentError> {
        self.update_status(id, scope, ShipmentStatus::Cancelled).await
    }
}

/// Concrete implementation using PostgreSQL repositories.
pub type PgShipmentService = ShipmentServiceImpl<
    PgShipmentRepository,
    PgOrderRepository,
    PgCourierRepository,
    PgCompanyRepository,
    PgWooStoreRepository,
>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        sample_courier, Address, Company, CompanyStatus, MockCompanyRepository,
        MockCourierRepository, MockOrderRepository, MockShipmentRepository,
        MockWooStoreRepository, OrderStatus, PaymentMode, WooCommerceStore, DEFAULT_CURRENCY,
    };
    use crate::infrastructure::woocommerce::{MockWooClientFactory, MockWooCommerceApi};

    type TestService = ShipmentServiceImpl<
        MockShipmentRepository,
        MockOrderRepository,
        MockCourierRepository,
        MockCompanyRepository,
        MockWooStoreRepository,
    >;

    struct Mocks {
        shipments: MockShipmentRepository,
        orders: MockOrderRepository,
        couriers: MockCourierRepository,
        companies: MockCompanyRepository,
        stores: MockWooStoreRepository,
        woo: MockWooClientFactory,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                shipments: MockShipmentRepository::new(),
                orders: MockOrderRepository::new(),
                couriers: MockCourierRepository::new(),
                companies: MockCompanyRepository::new(),
                stores: MockWooStoreRepository::new(),
                woo: MockWooClientFactory::new(),
            }
        }

        fn build(self) -> TestService {
            ShipmentServiceImpl::new(
                Arc::new(self.shipments),
                Arc::new(self.orders),
                Arc::new(self.couriers),
                Arc::new(self.companies),
                Arc::new(self.stores),
                Arc::new(self.woo),
            )
        }
    }

    fn address(pincode: &str) -> Address {
        Address {
            name: "Ravi".into(),
            phone: "9845012345".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Delhi".into(),
            state: "DL".into(),
            pincode: pincode.into(),
            country: "IN".into(),
        }
    }

    fn order(company_id: Uuid) -> Order {
        let now = Utc::now();
        Order {
            id: Uuid::now_v7(),
            company_id,
            channel: OrderChannel::Manual,
            store_id: None,
            external_id: None,
            order_number: "ORD-1".into(),
            status: OrderStatus::Processing,
            payment_mode: PaymentMode::Cod,
            customer_name: "Ravi".into(),
            customer_email: None,
            customer_phone: "9845012345".into(),
            shipping_address: address("110020"),
            items: vec![],
            subtotal: 500_000,
            discount: 0,
            shipping: 0,
            total: 500_000,
            currency: DEFAULT_CURRENCY.into(),
            weight_grams: 1_200,
            promo_code: None,
            external_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn company(id: Uuid) -> Company {
        let now = Utc::now();
        Company {
            id,
            name: "Acme".into(),
            legal_name: "Acme Retail".into(),
            email: "ops@acme.in".into(),
            phone: "9845012345".into(),
            gstin: None,
            billing_address: address("560001"),
            status: CompanyStatus::Active,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn shipment(status: ShipmentStatus, order_id: Uuid) -> Shipment {
        let now = Utc::now();
        Shipment {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            order_id,
            courier_id: Uuid::now_v7(),
            awb: Some("BD0000000001".into()),
            status,
            payment_mode: PaymentMode::Prepaid,
            cod_amount: 0,
            weight_grams: 500,
            length_cm: None,
            breadth_cm: None,
            height_cm: None,
            freight_charge: 4_000,
            cod_charge: 0,
            manifest_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(order_id: Uuid) -> CreateShipmentRequest {
        CreateShipmentRequest {
            order_id,
            courier_id: Uuid::now_v7(),
            pickup_pincode: None,
            weight_grams: None,
            length_cm: None,
            breadth_cm: None,
            height_cm: None,
        }
    }

    #[test]
    fn awb_has_prefix_and_ten_digits() {
        let awb = generate_awb("BD");
        assert_eq!(awb.len(), 12);
        assert!(awb.starts_with("BD"));
        assert!(awb[2..].bytes().all(|b| b.is_ascii_digit()));
    }

    #[tokio::test]
    async fn create_books_with_awb_and_charges() {
        let company_id = Uuid::now_v7();
        let order = order(company_id);
        let order_id = order.id;

        let mut mocks = Mocks::new();
        mocks
            .orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order.clone())));
        mocks.shipments.expect_has_live_shipment().returning(|_| Ok(false));
        mocks
            .companies
            .expect_find_by_id()
            .returning(|id| Ok(Some(company(id))));
        mocks
            .couriers
            .expect_find_by_id()
            .returning(|_| Ok(Some(sample_courier())));
        // First number collides.
        let mut seen = 0;
        mocks.shipments.expect_awb_exists().times(2).returning(move |_| {
            seen += 1;
            Ok(seen == 1)
        });
        mocks.shipments.expect_create().returning(|s| Ok(s.clone()));

        let shipment = mocks
            .build()
            .create(Some(company_id), request(order_id))
            .await
            .unwrap();

        assert_eq!(shipment.status, ShipmentStatus::AwbAssigned);
        assert!(shipment.awb.as_deref().is_some_and(|awb| awb.starts_with("BD")));
        assert_eq!(shipment.cod_amount, 500_000);
        // 1.2 kg -> 3 slabs; 2% of 5000.00
        assert_eq!(shipment.freight_charge, 4_000 + 2 * 3_000);
        assert_eq!(shipment.cod_charge, 10_000);
    }

    #[tokio::test]
    async fn create_rejects_second_live_shipment() {
        let company_id = Uuid::now_v7();
        let order = order(company_id);
        let order_id = order.id;

        let mut mocks = Mocks::new();
        mocks
            .orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order.clone())));
        mocks.shipments.expect_has_live_shipment().returning(|_| Ok(true));

        let err = mocks
            .build()
            .create(None, request(order_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipmentError::AlreadyShipped));
    }

    #[tokio::test]
    async fn create_rejects_closed_and_foreign_orders() {
        let company_id = Uuid::now_v7();
        let mut cancelled = order(company_id);
        cancelled.status = OrderStatus::Cancelled;
        let order_id = cancelled.id;

        let mut mocks = Mocks::new();
        mocks
            .orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(cancelled.clone())));
        let service = mocks.build();

        assert!(matches!(
            service.create(Some(company_id), request(order_id)).await,
            Err(ShipmentError::OrderClosed(_))
        ));
        assert!(matches!(
            service.create(Some(Uuid::now_v7()), request(order_id)).await,
            Err(ShipmentError::OrderNotFound)
        ));
    }

    #[tokio::test]
    async fn create_requires_serviceable_courier() {
        let company_id = Uuid::now_v7();
        let mut order = order(company_id);
        order.shipping_address.pincode = "400001".into();
        let order_id = order.id;

        let mut mocks = Mocks::new();
        mocks
            .orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(order.clone())));
        mocks.shipments.expect_has_live_shipment().returning(|_| Ok(false));
        mocks
            .companies
            .expect_find_by_id()
            .returning(|id| Ok(Some(company(id))));
        mocks
            .couriers
            .expect_find_by_id()
            .returning(|_| Ok(Some(sample_courier())));
        mocks.shipments.expect_create().never();

        let err = mocks
            .build()
            .create(None, request(order_id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ShipmentError::NotServiceable(NonServiceableReason::DeliveryNotCovered)
        ));
    }

    #[tokio::test]
    async fn invalid_transition_is_conflict() {
        let current = shipment(ShipmentStatus::AwbAssigned, Uuid::now_v7());
        let id = current.id;

        let mut mocks = Mocks::new();
        mocks
            .shipments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(current.clone())));
        mocks.shipments.expect_update_status().never();

        let err = mocks
            .build()
            .update_status(id, None, ShipmentStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn manifest_states_cannot_be_set_directly() {
        let err = Mocks::new()
            .build()
            .update_status(Uuid::now_v7(), None, ShipmentStatus::Manifested)
            .await
            .unwrap_err();
        assert!(matches!(err, ShipmentError::ManifestManaged));
    }

    #[tokio::test]
    async fn delivery_is_pushed_to_storefront() {
        let store_id = Uuid::now_v7();
        let mut woo_order = order(Uuid::now_v7());
        woo_order.channel = OrderChannel::WooCommerce;
        woo_order.store_id = Some(store_id);
        woo_order.external_id = Some(812);
        let current = shipment(ShipmentStatus::OutForDelivery, woo_order.id);
        let id = current.id;

        let mut mocks = Mocks::new();
        mocks
            .shipments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(current.clone())));
        mocks
            .shipments
            .expect_update_status()
            .withf(|_, from, to| {
                *from == ShipmentStatus::OutForDelivery && *to == ShipmentStatus::Delivered
            })
            .returning(|_, _, _| Ok(true));
        mocks
            .orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(woo_order.clone())));
        mocks.stores.expect_find_by_id().returning(|id| {
            let now = Utc::now();
            Ok(Some(WooCommerceStore {
                id,
                company_id: Uuid::now_v7(),
                name: "Chai Co".into(),
                store_url: "https://chai.example".into(),
                consumer_key: "ck".into(),
                consumer_secret: "cs".into(),
                webhook_secret: "secret".into(),
                is_active: true,
                last_synced_at: None,
                created_at: now,
                updated_at: now,
            }))
        });
        mocks.woo.expect_for_store().returning(|_| {
            let mut api = MockWooCommerceApi::new();
            api.expect_update_order_status()
                .withf(|id, status| *id == 812 && status.to_string() == "completed")
                .times(1)
                .returning(|_, _| Ok(()));
            Arc::new(api)
        });

        let updated = mocks
            .build()
            .update_status(id, None, ShipmentStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::Delivered);
    }

    #[tokio::test]
    async fn storefront_failure_does_not_fail_update() {
        let mut woo_order = order(Uuid::now_v7());
        woo_order.channel = OrderChannel::WooCommerce;
        woo_order.store_id = Some(Uuid::now_v7());
        woo_order.external_id = Some(9);
        let current = shipment(ShipmentStatus::AwbAssigned, woo_order.id);
        let id = current.id;

        let mut mocks = Mocks::new();
        mocks
            .shipments
            .expect_find_by_id()
            .returning(move |_| Ok(Some(current.clone())));
        mocks
            .shipments
            .expect_update_status()
            .returning(|_, _, _| Ok(true));
        mocks
            .orders
            .expect_find_by_id()
            .returning(move |_| Ok(Some(woo_order.clone())));
        mocks.stores.expect_find_by_id().returning(|_| {
            Err(AppError::Internal("connection reset".into()))
        });

        let cancelled = mocks.build().cancel(id, None).await.unwrap();
        assert_eq!(cancelled.status, ShipmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn lost_race_reports_fresh_state() {
        let current = shipment(ShipmentStatus::InTransit, Uuid::now_v7());
        let id = current.id;
        let mut calls = 0;

        let mut mocks = Mocks::new();
        mocks.shipments.expect_find_by_id().returning(move |_| {
            calls += 1;
            let mut s = current.clone();
            if calls > 1 {
                s.status = ShipmentStatus::Rto;
            }
            Ok(Some(s))
        });
        mocks
            .shipments
            .expect_update_status()
            .returning(|_, _, _| Ok(false));

        match mocks
            .build()
            .update_status(id, None, ShipmentStatus::OutForDelivery)
            .await
        {
            Err(ShipmentError::InvalidTransition { from, .. }) => {
                assert_eq!(from, ShipmentStatus::Rto)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
