pub mod scoped;
pub use scoped::{ScopedRepo, StoreOwned, StoreOwnedWrite};
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod store_repo;
pub use store_repo::StoreRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod catalog_repo;
pub use catalog_repo::ProductRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
