//! Package model: definitions as supplied by a repository source, and the
//! resolved variants the solver chooses between.

mod convert;
mod definition;
mod variant;

pub use definition::PackageDefinition;
pub use variant::PackageVariant;
