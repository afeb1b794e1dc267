//! Categories with derived slugs.

use crate::error::{DomainError, Result};
use crate::ids::CategoryId;
use crate::slug::slugify;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalog category.
///
/// `nombre` is unique across categories; `slug` is derived from it and is
/// regenerated whenever the name changes, so the two can never drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Identifier.
    pub id: CategoryId,
    /// Unique display name.
    pub nombre: String,
    /// Unique URL-safe slug derived from `nombre`.
    pub slug: String,
    /// Optional description.
    pub descripcion: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Maximum accepted name length.
    pub const NOMBRE_MAX: usize = 255;

    /// Build a new category, validating the name and deriving its slug.
    pub fn new(nombre: &str, descripcion: Option<String>, now: DateTime<Utc>) -> Result<Self> {
        let nombre = Self::validated_nombre(nombre)?;
        let slug = slugify(&nombre);
        Ok(Self {
            id: CategoryId::new(),
            nombre,
            slug,
            descripcion,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rename the category, regenerating the slug.
    pub fn rename(&mut self, nombre: &str, now: DateTime<Utc>) -> Result<()> {
        let nombre = Self::validated_nombre(nombre)?;
        self.slug = slugify(&nombre);
        self.nombre = nombre;
        self.updated_at = now;
        Ok(())
    }

    fn validated_nombre(nombre: &str) -> Result<String> {
        let nombre = nombre.trim();
        if nombre.is_empty() {
            return Err(DomainError::field("nombre", "El nombre es obligatorio"));
        }
        if nombre.len() > Self::NOMBRE_MAX {
            return Err(DomainError::field("nombre", "El nombre es demasiado largo"));
        }
        if slugify(nombre).is_empty() {
            return Err(DomainError::field(
                "nombre",
                "El nombre debe contener caracteres alfanuméricos",
            ));
        }
        Ok(nombre.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)] // Test code can use expect
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn new_category_derives_slug() {
        let cat = Category::new("Ciencia Ficción", None, now()).expect("valid name");
        assert_eq!(cat.slug, "ciencia-ficcion");
    }

    #[test]
    fn rename_regenerates_slug() {
        let mut cat = Category::new("Novela", None, now()).expect("valid name");
        cat.rename("Novela Histórica", now()).expect("valid rename");
        assert_eq!(cat.nombre, "Novela Histórica");
        assert_eq!(cat.slug, "novela-historica");
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(Category::new("   ", None, now()).is_err());
    }

    #[test]
    fn symbol_only_name_is_rejected() {
        assert!(Category::new("!!!", None, now()).is_err());
    }
}
