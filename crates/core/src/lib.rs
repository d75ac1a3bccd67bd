//! Domain core for the layerhub design backend.
//!
//! Holds the layer tagged-union codec (JSON and document format), the
//! design aggregate (templates, projects, components, frames), identifier
//! generation, list filters, the error taxonomy, and the collaborator
//! traits the orchestrator is wired against.

pub mod blob;
pub mod design;
pub mod document;
pub mod error;
pub mod filter;
pub mod ids;
pub mod layer;
pub mod render;
pub mod resource;
pub mod store;
pub mod types;
