//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool` (or any Postgres executor, so they compose inside a
//! transaction) as the first argument.

pub mod component_repo;
pub mod filter;
pub mod frame_repo;
pub mod project_repo;
pub mod template_repo;

pub use component_repo::ComponentRepo;
pub use frame_repo::FrameRepo;
pub use project_repo::ProjectRepo;
pub use template_repo::TemplateRepo;
