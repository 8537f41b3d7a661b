//! Application services: listing and detail flows, query planning, revalidation.

pub mod blog;
pub mod error;
pub mod pagination;
pub mod queries;
pub mod repos;
pub mod revalidate;
