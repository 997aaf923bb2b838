//! Application Layer
//!
//! Use-case services and the request/response DTOs exchanged with the
//! presentation layer. Services depend on domain repository traits only.

pub mod dto;
pub mod services;
