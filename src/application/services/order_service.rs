//! Order Service
//!
//! Manual order entry and order lookups. Storefront orders arrive through
//! the WooCommerce sync instead.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use uuid::Uuid;

use crate::application::dto::request::CreateOrderRequest;
use crate::application::services::coupon_service::{CouponError, CouponService};
use crate::domain::{
    normalize_phone, CompanyRepository, Order, OrderChannel, OrderFilter, OrderItem,
    OrderRepository, OrderStatus, PaymentMode, DEFAULT_CURRENCY,
};
use crate::infrastructure::repositories::{PgCompanyRepository, PgOrderRepository};
use crate::shared::error::{AppError, FieldError};
use crate::shared::pagination::{Paginated, Pagination};

/// Weight assumed for a unit whose weight is unknown.
pub const DEFAULT_ITEM_WEIGHT_GRAMS: i32 = 500;

/// Order service trait.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create a manual order. `scope` is the caller's company for sellers.
    async fn create(
        &self,
        scope: Option<Uuid>,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError>;

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<Order, OrderError>;

    async fn list(
        &self,
        filter: OrderFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Order>, OrderError>;
}

/// Order service errors.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,

    #[error("Company not found")]
    CompanyNotFound,

    #[error("Company is not active")]
    CompanyInactive,

    #[error("Invalid order")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound | OrderError::CompanyNotFound => {
                AppError::NotFound(err.to_string())
            }
            OrderError::CompanyInactive => AppError::Unprocessable(err.to_string()),
            OrderError::Invalid(errors) => AppError::from_field_errors(errors),
            OrderError::Coupon(e) => e.into(),
            OrderError::Repository(e) => e,
        }
    }
}

/// Total weight of the items, defaulting unknown unit weights.
///
/// `None` when the total does not fit in an `i32`.
pub fn items_weight(items: &[OrderItem]) -> Option<i32> {
    items.iter().try_fold(0i32, |total, item| {
        item.quantity
            .max(0)
            .checked_mul(item.weight_grams.unwrap_or(DEFAULT_ITEM_WEIGHT_GRAMS))
            .and_then(|w| total.checked_add(w))
    })
}

fn generate_order_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Order service implementation.
pub struct OrderServiceImpl<O, C>
where
    O: OrderRepository,
    C: CompanyRepository,
{
    order_repo: Arc<O>,
    company_repo: Arc<C>,
    coupons: Arc<dyn CouponService>,
}

impl<O, C> OrderServiceImpl<O, C>
where
    O: OrderRepository,
    C: CompanyRepository,
{
    pub fn new(order_repo: Arc<O>, company_repo: Arc<C>, coupons: Arc<dyn CouponService>) -> Self {
        Self {
            order_repo,
            company_repo,
            coupons,
        }
    }
}

#[async_trait]
impl<O, C> OrderService for OrderServiceImpl<O, C>
where
    O: OrderRepository + 'static,
    C: CompanyRepository + 'static,
{
    #[tracing::instrument(skip(self, request))]
    async fn create(
        &self,
        scope: Option<Uuid>,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError> {
        let company_id = match scope.or(request.company_id) {
            Some(id) => id,
            None => {
                return Err(OrderError::Invalid(vec![FieldError::new(
                    "company_id",
                    "is required",
                )]))
            }
        };

        let mut errors = Vec::new();
        let shipping_address = request.shipping_address.normalize();
        if let Err(address_errors) = shipping_address.validate() {
            errors.extend(address_errors.into_iter().map(|e| {
                FieldError::new(format!("shipping_address.{}", e.field), e.message)
            }));
        }
        let customer_phone = match normalize_phone(&request.customer_phone) {
            Some(phone) => phone,
            None => {
                errors.push(FieldError::new(
                    "customer_phone",
                    "must be a 10 digit mobile number starting with 6-9",
                ));
                String::new()
            }
        };
        if !errors.is_empty() {
            return Err(OrderError::Invalid(errors));
        }

        let company = self
            .company_repo
            .find_by_id(company_id)
            .await?
            .filter(|c| !c.is_deleted)
            .ok_or(OrderError::CompanyNotFound)?;
        if !company.is_active() {
            return Err(OrderError::CompanyInactive);
        }

        let items: Vec<OrderItem> = request
            .items
            .into_iter()
            .map(|item| OrderItem {
                sku: item.sku.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                name: item.name.trim().to_string(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                weight_grams: item.weight_grams,
                external_product_id: None,
            })
            .collect();
        let subtotal = items
            .iter()
            .fold(0i64, |acc, item| acc.saturating_add(item.line_total()));
        let weight_grams = match request.weight_grams.or_else(|| items_weight(&items)) {
            Some(w) => w,
            None => {
                return Err(OrderError::Invalid(vec![FieldError::new(
                    "weight_grams",
                    "total item weight is out of range",
                )]))
            }
        };

        // Redeemed before the insert; a failed insert leaves the use consumed.
        let (discount, promo_code) = match request.coupon_code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => {
                let applied = self.coupons.redeem(code, Some(company_id), subtotal).await?;
                (applied.discount, Some(code.to_uppercase()))
            }
            _ => (0, None),
        };

        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(),
            company_id,
            channel: OrderChannel::Manual,
            store_id: None,
            external_id: None,
            order_number: request
                .order_number
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(generate_order_number),
            status: OrderStatus::Pending,
            payment_mode: request.payment_mode,
            customer_name: request.customer_name.trim().to_string(),
            customer_email: request
                .customer_email
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty()),
            customer_phone,
            shipping_address,
            items,
            subtotal,
            discount,
            shipping: request.shipping,
            total: (subtotal - discount).saturating_add(request.shipping),
            currency: DEFAULT_CURRENCY.to_string(),
            weight_grams,
            promo_code,
            external_updated_at: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.order_repo.create(&order).await?;

        tracing::info!(
            order_id = %created.id,
            company_id = %company_id,
            total = created.total,
            cod = matches!(created.payment_mode, PaymentMode::Cod),
            "Manual order created"
        );
        Ok(created)
    }

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<Order, OrderError> {
        self.order_repo
            .find_by_id(id)
            .await?
            .filter(|o| scope.map_or(true, |company| o.company_id == company))
            .ok_or(OrderError::NotFound)
    }

    async fn list(
        &self,
        filter: OrderFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Order>, OrderError> {
        let (orders, total) = self.order_repo.list(&filter, pagination).await?;
        Ok(Paginated::new(orders, total, pagination))
    }
}

/// Concrete implementation using PostgreSQL repositories.
pub type PgOrderService = OrderServiceImpl<PgOrderRepository, PgCompanyRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::request::OrderItemRequest;
    use crate::application::services::coupon_service::MockCouponService;
    use crate::domain::{
        Address, AppliedDiscount, Company, CompanyStatus, MockCompanyRepository,
        MockOrderRepository, RejectReason,
    };

    fn address() -> Address {
        Address {
            name: "Ravi Kumar".into(),
            phone: "+91 98450 12345".into(),
            line1: "12 MG Road".into(),
            line2: None,
            city: "Bengaluru".into(),
            state: "ka".into(),
            pincode: "560001".into(),
            country: "IN".into(),
        }
    }

    fn company(id: Uuid, status: CompanyStatus) -> Company {
        let now = Utc::now();
        Company {
            id,
            name: "Acme".into(),
            legal_name: "Acme Retail Pvt Ltd".into(),
            email: "ops@acme.in".into(),
            phone: "9845012345".into(),
            gstin: None,
            billing_address: address(),
            status,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(coupon: Option<&str>) -> CreateOrderRequest {
        CreateOrderRequest {
            company_id: None,
            order_number: None,
            payment_mode: PaymentMode::Cod,
            customer_name: " Ravi Kumar ".into(),
            customer_email: None,
            customer_phone: "098450 12345".into(),
            shipping_address: address(),
            items: vec![
                OrderItemRequest {
                    sku: Some("MUG-1".into()),
                    name: "Mug".into(),
                    quantity: 2,
                    unit_price: 25_000,
                    weight_grams: Some(350),
                },
                OrderItemRequest {
                    sku: None,
                    name: "Coaster".into(),
                    quantity: 3,
                    unit_price: 5_000,
                    weight_grams: None,
                },
            ],
            shipping: 4_000,
            weight_grams: None,
            coupon_code: coupon.map(Into::into),
        }
    }

    fn companies(status: CompanyStatus) -> MockCompanyRepository {
        let mut repo = MockCompanyRepository::new();
        repo.expect_find_by_id()
            .returning(move |id| Ok(Some(company(id, status))));
        repo
    }

    #[tokio::test]
    async fn create_computes_totals_and_weight() {
        let mut orders = MockOrderRepository::new();
        orders.expect_create().returning(|o| Ok(o.clone()));

        let service = OrderServiceImpl::new(
            Arc::new(orders),
            Arc::new(companies(CompanyStatus::Active)),
            Arc::new(MockCouponService::new()),
        );
        let order = service
            .create(Some(Uuid::now_v7()), request(None))
            .await
            .unwrap();

        assert_eq!(order.subtotal, 65_000);
        assert_eq!(order.total, 69_000);
        assert_eq!(order.weight_grams, 2 * 350 + 3 * DEFAULT_ITEM_WEIGHT_GRAMS);
        assert_eq!(order.customer_phone, "9845012345");
        assert_eq!(order.shipping_address.state, "KA");
        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.collectable_amount(), 69_000);
    }

    #[tokio::test]
    async fn create_applies_coupon() {
        let company_id = Uuid::now_v7();
        let mut coupons = MockCouponService::new();
        coupons
            .expect_redeem()
            .withf(move |code, company, value| {
                code.to_string() == "SAVE10" && *company == Some(company_id) && *value == 65_000
            })
            .returning(|_, _, _| {
                Ok(AppliedDiscount {
                    discount: 6_500,
                    final_amount: 58_500,
                })
            });
        let mut orders = MockOrderRepository::new();
        orders.expect_create().returning(|o| Ok(o.clone()));

        let service = OrderServiceImpl::new(
            Arc::new(orders),
            Arc::new(companies(CompanyStatus::Active)),
            Arc::new(coupons),
        );
        let order = service
            .create(Some(company_id), request(Some(" SAVE10 ")))
            .await
            .unwrap();

        assert_eq!(order.discount, 6_500);
        assert_eq!(order.total, 65_000 - 6_500 + 4_000);
        assert_eq!(order.promo_code.as_deref(), Some("SAVE10"));
    }

    #[tokio::test]
    async fn overflowing_item_weight_is_rejected() {
        let mut req = request(None);
        req.items[1].quantity = 5_000_000;
        let mut orders = MockOrderRepository::new();
        orders.expect_create().never();

        let service = OrderServiceImpl::new(
            Arc::new(orders),
            Arc::new(companies(CompanyStatus::Active)),
            Arc::new(MockCouponService::new()),
        );
        match service.create(Some(Uuid::now_v7()), req).await {
            Err(OrderError::Invalid(errors)) => assert_eq!(errors[0].field, "weight_grams"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejected_coupon_fails_order() {
        let mut coupons = MockCouponService::new();
        coupons
            .expect_redeem()
            .returning(|_, _, _| Err(CouponError::Rejected(RejectReason::Expired)));
        let mut orders = MockOrderRepository::new();
        orders.expect_create().never();

        let service = OrderServiceImpl::new(
            Arc::new(orders),
            Arc::new(companies(CompanyStatus::Active)),
            Arc::new(coupons),
        );
        let err = service
            .create(Some(Uuid::now_v7()), request(Some("OLD")))
            .await
            .unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn admin_must_name_company() {
        let service = OrderServiceImpl::new(
            Arc::new(MockOrderRepository::new()),
            Arc::new(MockCompanyRepository::new()),
            Arc::new(MockCouponService::new()),
        );
        match service.create(None, request(None)).await {
            Err(OrderError::Invalid(errors)) => assert_eq!(errors[0].field, "company_id"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn suspended_company_cannot_order() {
        let service = OrderServiceImpl::new(
            Arc::new(MockOrderRepository::new()),
            Arc::new(companies(CompanyStatus::Suspended)),
            Arc::new(MockCouponService::new()),
        );
        assert!(matches!(
            service.create(Some(Uuid::now_v7()), request(None)).await,
            Err(OrderError::CompanyInactive)
        ));
    }

    #[tokio::test]
    async fn invalid_address_is_reported_per_field() {
        let mut req = request(None);
        req.shipping_address.pincode = "012345".into();
        let service = OrderServiceImpl::new(
            Arc::new(MockOrderRepository::new()),
            Arc::new(MockCompanyRepository::new()),
            Arc::new(MockCouponService::new()),
        );
        match service.create(Some(Uuid::now_v7()), req).await {
            Err(OrderError::Invalid(errors)) => {
                assert_eq!(errors[0].field, "shipping_address.pincode");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_hides_other_companies_orders() {
        let owner = Uuid::now_v7();
        let mut orders = MockOrderRepository::new();
        orders.expect_find_by_id().returning(move |id| {
            let mut order = sample_order(id);
            order.company_id = owner;
            Ok(Some(order))
        });

        let service = OrderServiceImpl::new(
            Arc::new(orders),
            Arc::new(MockCompanyRepository::new()),
            Arc::new(MockCouponService::new()),
        );
        let id = Uuid::now_v7();
        assert!(service.get(id, Some(owner)).await.is_ok());
        assert!(service.get(id, None).await.is_ok());
        assert!(matches!(
            service.get(id, Some(Uuid::now_v7())).await,
            Err(OrderError::NotFound)
        ));
    }

    fn sample_order(id: Uuid) -> Order {
        let now = Utc::now();
        Order {
            id,
            company_id: Uuid::now_v7(),
            channel: OrderChannel::Manual,
            store_id: None,
            external_id: None,
            order_number: "ORD-1".into(),
            status: OrderStatus::Pending,
            payment_mode: PaymentMode::Prepaid,
            customer_name: "Ravi".into(),
            customer_email: None,
            customer_phone: "9845012345".into(),
            shipping_address: address(),
            items: vec![],
            subtotal: 0,
            discount: 0,
            shipping: 0,
            total: 0,
            currency: DEFAULT_CURRENCY.into(),
            weight_grams: 500,
            promo_code: None,
            external_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
