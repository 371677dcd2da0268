//! Binding de parámetros: infraestructura por tipo → nombre → posición.

pub mod binder;

pub use binder::{BindingSource, NameMatching, ParameterBinder};
