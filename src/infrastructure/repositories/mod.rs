//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgCompanyRepository** - Company onboarding and status
//! - **PgPromoCodeRepository** - Coupons with conditional usage increment
//! - **PgCourierRepository** - Courier tariffs and coverage
//! - **PgOrderRepository** - Orders, including last-write-wins storefront upsert
//! - **PgShipmentRepository** - Shipments with guarded status updates
//! - **PgManifestRepository** - Transactional manifest lifecycle
//! - **PgWooStoreRepository** / **PgProductMappingRepository** - Storefront connections
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgOrderRepository, PgShipmentRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let orders = PgOrderRepository::new(pool.clone());
//!     let shipments = PgShipmentRepository::new(pool);
//! }
//! ```

pub mod company_repository;
pub mod courier_repository;
pub mod manifest_repository;
pub mod order_repository;
pub mod promo_code_repository;
pub mod shipment_repository;
pub mod woo_store_repository;

pub use company_repository::PgCompanyRepository;
pub use courier_repository::PgCourierRepository;
pub use manifest_repository::PgManifestRepository;
pub use order_repository::PgOrderRepository;
pub use promo_code_repository::PgPromoCodeRepository;
pub use shipment_repository::PgShipmentRepository;
pub use woo_store_repository::{PgProductMappingRepository, PgWooStoreRepository};
