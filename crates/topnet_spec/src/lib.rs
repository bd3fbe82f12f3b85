//! # topnet_spec
//!
//! The structured component specification consumed by the topology builder,
//! plus the tier classifier that maps free-text intent to an architecture
//! tier. The natural-language layer that produces specs lives outside this
//! workspace; here a spec is an already-shaped input, loaded from JSON or
//! YAML or handed over directly.

pub mod error;
pub mod models;
pub mod reader;
pub mod tier;

pub use error::{SpecError, SpecResult};
pub use models::{ComponentRole, ComponentSpec, Constraints, TopologySpec};
pub use reader::SpecReader;
pub use tier::{classify_spec, classify_text, signals_high_availability, Tier};
