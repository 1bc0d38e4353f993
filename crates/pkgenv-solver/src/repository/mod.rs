//! Package repository interface.
//!
//! A repository answers two questions for the solver: which versions of a
//! package family exist, and which variants a given version has. It is
//! passed explicitly to each solve and is read-only while solving.

mod memory;

use std::sync::Arc;

use pkgenv_version::Version;

use crate::error::RepositoryError;
use crate::package::PackageVariant;

pub use memory::MemoryRepository;

/// Lazily produced versions of one package family, newest first
pub type Versions<'a> = Box<dyn Iterator<Item = Version> + 'a>;

/// Read-only source of packages.
///
/// Implementations may block on I/O; the solver calls them without holding
/// any lock. The interface does no caching of its own.
pub trait Repository: Send + Sync {
    /// Name used in logs and cache metadata
    fn name(&self) -> &str;

    /// Versions of `name` in descending order.
    ///
    /// Fails with [`RepositoryError::PackageNotFound`] when the family has
    /// no versions at all.
    fn get_versions(&self, name: &str) -> Result<Versions<'_>, RepositoryError>;

    /// Variants of one version, in declaration order
    fn get_variants(
        &self,
        name: &str,
        version: &Version,
    ) -> Result<Vec<Arc<PackageVariant>>, RepositoryError>;

    /// Token summarizing the current state of a package family.
    ///
    /// Used only as a cache key component. `None` means the family is
    /// unknown to the repository.
    fn fingerprint(&self, family: &str) -> Result<Option<String>, RepositoryError>;
}
