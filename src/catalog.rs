//! Signature catalog loaded from a directory tree
//!
//! Every declaration file under the root yields one [`Signature`]. A file
//! that fails to parse is reported and skipped so that one broken signature
//! never empties the catalog.

use crate::signature::{Signature, SignatureError};
use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions recognized as signature declarations
pub const DEFAULT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A declaration file that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: SignatureError,
}

/// Outcome of loading a signature directory
#[derive(Debug)]
pub struct CatalogLoad {
    pub catalog: SignatureCatalog,
    pub failures: Vec<LoadFailure>,
}

/// Immutable, ordered collection of signatures
#[derive(Debug, Clone, Default)]
pub struct SignatureCatalog {
    signatures: Vec<Signature>,
}

impl SignatureCatalog {
    pub fn from_signatures(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    /// Load every declaration under `root`, recursively
    ///
    /// Files are visited in sorted path order so that output is reproducible.
    /// Extensions are compared case-insensitively.
    ///
    /// # Errors
    /// Fails only if `root` is not a directory. Per-file parse errors and
    /// unreadable entries (dangling links, loops, denied subdirectories) are
    /// collected in [`CatalogLoad::failures`].
    pub fn load<P: AsRef<Path>>(root: P, extensions: &[String]) -> Result<CatalogLoad> {
        let root = root.as_ref();
        if !root.is_dir() {
            anyhow::bail!("Signature directory not found: {}", root.display());
        }

        let mut signatures = Vec::new();
        let mut failures = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    let path = error.path().unwrap_or(root).to_path_buf();
                    if path.extension().is_some() && !has_extension(&path, extensions) {
                        tracing::debug!("Ignoring unreadable entry {}: {}", path.display(), error);
                        continue;
                    }

                    tracing::warn!("Skipping unreadable entry {}: {}", path.display(), error);
                    failures.push(LoadFailure {
                        path: path.clone(),
                        error: SignatureError::Io {
                            path,
                            source: error.into(),
                        },
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
                continue;
            }

            let path = entry.path();
            tracing::info!("Loading signature at '{}'", path.display());

            match Signature::from_file(path) {
                Ok(signature) => {
                    for element in signature.unrecognized_elements() {
                        tracing::warn!(
                            "{}: rule element '{}' is not supported and will fail when evaluated",
                            path.display(),
                            element
                        );
                    }
                    signatures.push(signature);
                }
                Err(error) => {
                    tracing::warn!("Skipping signature {}: {}", path.display(), error);
                    failures.push(LoadFailure {
                        path: path.to_path_buf(),
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            "Loaded {} signatures ({} failed) from {}",
            signatures.len(),
            failures.len(),
            root.display()
        );

        Ok(CatalogLoad {
            catalog: Self { signatures },
            failures,
        })
    }

    /// Load with the default `.yaml`/`.yml` extensions
    pub fn load_default<P: AsRef<Path>>(root: P) -> Result<CatalogLoad> {
        let extensions: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        Self::load(root, &extensions)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        self.signatures.iter()
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// Signatures tagged with a technique
    pub fn by_technique<'a>(&'a self, technique: &'a str) -> impl Iterator<Item = &'a Signature> {
        self.signatures
            .iter()
            .filter(move |s| s.technique == technique)
    }

    /// Distinct technique labels, in first-seen order
    pub fn techniques(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for signature in &self.signatures {
            if !seen.contains(&signature.technique.as_str()) {
                seen.push(&signature.technique);
            }
        }
        seen
    }
}

impl<'a> IntoIterator for &'a SignatureCatalog {
    type Item = &'a Signature;
    type IntoIter = std::slice::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.iter()
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
