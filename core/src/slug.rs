//! Slug derivation for category names.
//!
//! A slug is the lowercase, diacritic-free, hyphenated form of a display
//! name: `"Ciencia Ficción"` → `"ciencia-ficcion"`. Derivation is
//! deterministic, so renaming a category always yields the same slug for
//! the same name.

/// Derive a URL-safe slug from a display name.
///
/// Rules: lowercase, Latin diacritics folded to their base letter, every
/// run of non-alphanumeric characters collapsed to a single hyphen, and no
/// leading or trailing hyphen.
#[must_use]
pub fn slugify(nombre: &str) -> String {
    let mut slug = String::with_capacity(nombre.len());
    let mut pending_hyphen = false;

    for c in nombre.chars().flat_map(char::to_lowercase) {
        let folded = fold_diacritic(c);
        if folded.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(folded);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Fold common Latin diacritics onto their ASCII base letter. Characters
/// outside the table pass through unchanged (and are then dropped by the
/// alphanumeric filter in `slugify` if still non-ASCII).
const fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Novela Negra"), "novela-negra");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(slugify("Ciencia Ficción"), "ciencia-ficcion");
        assert_eq!(slugify("Poesía Española"), "poesia-espanola");
    }

    #[test]
    fn collapses_symbol_runs_to_single_hyphen() {
        assert_eq!(slugify("Arte  &  Diseño"), "arte-diseno");
        assert_eq!(slugify("¡Clásicos! (Siglo XIX)"), "clasicos-siglo-xix");
    }

    #[test]
    fn trims_edge_hyphens() {
        assert_eq!(slugify("  Historia  "), "historia");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(slugify("Café con Leche"), slugify("Café con Leche"));
    }
}
