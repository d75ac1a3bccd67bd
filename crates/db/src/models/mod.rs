//! Row models.
//!
//! Each submodule contains a `FromRow` struct matching the database row and
//! the conversions to and from the domain type in `layerhub_core::design`.
//! Layers are never stored relationally; rows hydrate with empty layers.

pub mod component;
pub mod frame;
pub mod project;
pub mod template;
