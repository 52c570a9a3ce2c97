//! GraphQL documents loaded from `<dir>/<field>.graphql`.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cap_std::{ambient_authority, fs::Dir};
use thiserror::Error;

/// Errors raised while loading or looking up documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The documents directory could not be opened.
    #[error("open documents directory '{}': {source}", path.display())]
    Directory {
        /// Directory that failed to open.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A document file could not be read.
    #[error("read document '{field}.graphql': {source}")]
    Read {
        /// Operation field the document serves.
        field: String,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// A document file was blank.
    #[error("document '{field}.graphql' is empty")]
    Empty {
        /// Operation field the document serves.
        field: String,
    },
    /// No document was loaded for the field.
    #[error("no document loaded for '{field}'")]
    Missing {
        /// Operation field that was looked up.
        field: String,
    },
}

/// Documents keyed by their top-level operation field.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    documents: HashMap<String, Arc<str>>,
}

impl DocumentSet {
    /// Read `<dir>/<field>.graphql` for every field.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] when the directory or a file cannot be
    /// read, or when a file is blank.
    pub fn load<'a>(
        dir: &Path,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, DocumentError> {
        let directory =
            Dir::open_ambient_dir(dir, ambient_authority()).map_err(|source| {
                DocumentError::Directory {
                    path: dir.to_path_buf(),
                    source,
                }
            })?;
        let mut set = Self::default();
        for field in fields {
            let text = directory
                .read_to_string(format!("{field}.graphql"))
                .map_err(|source| DocumentError::Read {
                    field: field.to_owned(),
                    source,
                })?;
            if text.trim().is_empty() {
                return Err(DocumentError::Empty {
                    field: field.to_owned(),
                });
            }
            set.documents.insert(field.to_owned(), Arc::from(text));
        }
        Ok(set)
    }

    /// Add or replace the document for `field`.
    #[must_use]
    pub fn with_document(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents
            .insert(field.into(), Arc::from(text.into()));
        self
    }

    /// Document for `field`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Missing`] when nothing was loaded for it.
    pub fn get(&self, field: &str) -> Result<&str, DocumentError> {
        self.documents
            .get(field)
            .map(AsRef::as_ref)
            .ok_or_else(|| DocumentError::Missing {
                field: field.to_owned(),
            })
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether no documents are held.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for document loading.
    use super::*;
    use tempfile::TempDir;

    const LIST_VEHICLES: &str = "query GetAllVehicle { getAllVehicle { id } }";
    const DELETE_VEHICLE: &str = "mutation DeleteVehicle($id: UUID!) { deleteVehicle(id: $id) }";

    fn write(dir: &TempDir, name: &str, text: &str) {
        let directory = Dir::open_ambient_dir(dir.path(), ambient_authority()).expect("open dir");
        directory.write(name, text).expect("write document");
    }

    #[test]
    fn loads_each_requested_field() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "getAllVehicle.graphql", LIST_VEHICLES);
        write(&dir, "deleteVehicle.graphql", DELETE_VEHICLE);

        let set = DocumentSet::load(dir.path(), ["getAllVehicle", "deleteVehicle"])
            .expect("documents load");

        assert_eq!(set.len(), 2);
        let listing = set.get("getAllVehicle").expect("present");
        assert!(listing.contains("GetAllVehicle"));
    }

    #[test]
    fn missing_file_names_the_field() {
        let dir = TempDir::new().expect("temp dir");
        let err = DocumentSet::load(dir.path(), ["drivers"]).expect_err("file missing");
        match err {
            DocumentError::Read { field, .. } => assert_eq!(field, "drivers"),
            other => panic!("expected a read error, got {other:?}"),
        }
    }

    #[test]
    fn blank_file_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        write(&dir, "users.graphql", "  \n");
        let err = DocumentSet::load(dir.path(), ["users"]).expect_err("blank document");
        assert_eq!(err.to_string(), "document 'users.graphql' is empty");
    }

    #[test]
    fn lookup_of_unknown_field_fails() {
        let set = DocumentSet::default().with_document("users", "query { users { id } }");
        assert!(set.get("users").is_ok());
        let missing = set.get("drivers");
        assert!(matches!(missing, Err(DocumentError::Missing { .. })));
    }

    #[test]
    fn bundled_documents_cover_every_gateway_operation() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("graphql");
        let fields = crate::outbound::graphql::required_documents();

        let set = DocumentSet::load(&dir, fields.iter().copied()).expect("bundled documents load");

        assert_eq!(set.len(), fields.len());
        for field in fields {
            let text = set.get(field).expect("document present");
            assert!(text.contains(field), "{field} document must select it");
        }
    }
}
