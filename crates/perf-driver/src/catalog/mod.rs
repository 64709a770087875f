//! Executable Resolver
//!
//! Maps a (test, variant) pair to exactly one benchmark executable. The
//! catalog is built once from three disjoint sets of paths and is a pure
//! lookup table afterwards.

use crate::config::DriverConfig;
use crate::error::CatalogError;
use crate::types::{BenchmarkDescriptor, TestId, Variant};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pre-enumerated executable paths, one set per variant
///
/// A variant set is `None` when its directory does not exist.
#[derive(Debug, Clone, Default)]
pub struct ExecutableSets {
    pub baseline: Vec<PathBuf>,
    pub thread_library: Option<Vec<PathBuf>>,
    pub stack_overflow_handling: Option<Vec<PathBuf>>,
}

/// List the executables of an install directory
///
/// Baseline executables are the regular files of `root`; the variant sets
/// are the files of its `pthreads` and `stack` subdirectories. Paths are
/// sorted so catalogs built from the same tree are identical.
pub fn discover(root: &Path) -> Result<ExecutableSets, CatalogError> {
    let baseline = list_files(root)?;
    let variant_set = |variant: Variant| -> Result<Option<Vec<PathBuf>>, CatalogError> {
        let Some(subdirectory) = variant.subdirectory() else {
            return Ok(None);
        };
        let dir = root.join(subdirectory);
        if dir.is_dir() {
            list_files(&dir).map(Some)
        } else {
            Ok(None)
        }
    };
    Ok(ExecutableSets {
        thread_library: variant_set(Variant::ThreadLibrary)?,
        stack_overflow_handling: variant_set(Variant::StackOverflowHandling)?,
        baseline,
    })
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogError> {
    let io_error = |source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        // Follows symlinks, so linked executables are listed too.
        let path = entry.map_err(io_error)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Catalog of benchmark executables
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<(TestId, Variant), BenchmarkDescriptor>,
}

impl Catalog {
    /// Build the catalog from the three executable sets
    ///
    /// # Errors
    /// - `MissingVariantSet` if either variant set is absent
    /// - `DuplicateEntry` if two files of one set carry the same test ID
    pub fn from_sets(sets: ExecutableSets, config: &DriverConfig) -> Result<Self, CatalogError> {
        let thread_library = sets
            .thread_library
            .ok_or(CatalogError::MissingVariantSet(Variant::ThreadLibrary))?;
        let stack = sets
            .stack_overflow_handling
            .ok_or(CatalogError::MissingVariantSet(Variant::StackOverflowHandling))?;

        let mut catalog = Self::default();
        for (variant, paths) in [
            (Variant::Baseline, sets.baseline),
            (Variant::ThreadLibrary, thread_library),
            (Variant::StackOverflowHandling, stack),
        ] {
            let scheme = config.naming.scheme(variant);
            for path in paths {
                let Some(test_id) = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| scheme.extract(name))
                else {
                    tracing::warn!("Skipping {}: no test number in file name", path.display());
                    continue;
                };
                catalog.insert(BenchmarkDescriptor {
                    test_id,
                    variant,
                    arg_count: config.arg_count(test_id),
                    path,
                })?;
            }
        }
        tracing::debug!("Cataloged {} executables", catalog.len());
        Ok(catalog)
    }

    fn insert(&mut self, descriptor: BenchmarkDescriptor) -> Result<(), CatalogError> {
        let key = (descriptor.test_id, descriptor.variant);
        if let Some(existing) = self.entries.get(&key) {
            return Err(CatalogError::DuplicateEntry {
                test_id: descriptor.test_id,
                variant: descriptor.variant,
                first: existing.path.clone(),
                second: descriptor.path,
            });
        }
        self.entries.insert(key, descriptor);
        Ok(())
    }

    /// Resolve the executable of a (test, variant) pair
    ///
    /// # Errors
    /// Returns `NotFound` if no executable was cataloged for the pair
    pub fn resolve(
        &self,
        test_id: TestId,
        variant: Variant,
    ) -> Result<&BenchmarkDescriptor, CatalogError> {
        self.entries
            .get(&(test_id, variant))
            .ok_or(CatalogError::NotFound { test_id, variant })
    }

    /// Baseline test IDs in ascending order
    pub fn test_ids(&self) -> Vec<TestId> {
        self.entries
            .keys()
            .filter(|(_, variant)| *variant == Variant::Baseline)
            .map(|(test_id, _)| *test_id)
            .collect()
    }

    /// All descriptors, ordered by test then variant
    pub fn descriptors(&self) -> impl Iterator<Item = &BenchmarkDescriptor> {
        self.entries.values()
    }

    /// Number of cataloged executables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was cataloged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
