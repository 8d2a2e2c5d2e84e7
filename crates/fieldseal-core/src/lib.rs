//! Core library for `fieldseal`.
//!
//! Locates sensitive values inside schema-less JSON documents with wildcard
//! path patterns and runs each one through a pluggable cipher, writing the
//! results back without disturbing any other byte of the document. Contains
//! the pattern resolver, secure-field registry, value transformer, cipher
//! backends, settings loading, and credential helpers. This crate depends on
//! `fieldseal-module` for the cipher module runtime and knows nothing about
//! where documents come from or go to.

pub mod cipher;
pub mod credentials;
pub mod error;
pub mod indirection;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod settings;
mod splice;
pub mod transform;

pub use cipher::{CipherBackend, ModuleCipher, PassThroughCipher, cipher_from_settings};
pub use error::{CipherError, ConfigError, PatternError};
pub use pattern::WildcardPattern;
pub use registry::FieldRegistry;
pub use resource::ResourceType;
pub use settings::Settings;
pub use transform::{Transformed, transform};
