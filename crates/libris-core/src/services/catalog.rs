//! Catalog helpers
//!
//! Each physical copy is its own book record. Adding a title with several
//! copies expands into one create request per copy, sharing bibliographic
//! fields but carrying its own identifiers and a `k of n` copy number.

use crate::error::{Error, Result};
use crate::models::NewBook;

/// Identifiers unique to one physical copy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CopyIdentifiers {
    pub isbn: Option<String>,
    pub accession_number: Option<String>,
    pub barcode: Option<String>,
}

/// Format a copy number, e.g. `2 of 5`
pub fn copy_label(index: u32, total: u32) -> String {
    format!("{} of {}", index, total)
}

/// Check the fields every book needs before it is submitted
pub fn validate_new_book(book: &NewBook) -> Result<()> {
    if book.title.trim().is_empty() {
        return Err(Error::validation("Title is required"));
    }
    if book.copies == 0 {
        return Err(Error::validation("Copies must be at least 1"));
    }
    Ok(())
}

/// Expand a title into one create request per physical copy.
///
/// `variants` supplies per-copy identifiers; its length is the number of
/// copies. An empty list yields a single copy using the base identifiers.
pub fn expand_variants(base: &NewBook, variants: &[CopyIdentifiers]) -> Result<Vec<NewBook>> {
    validate_new_book(&NewBook { copies: 1, ..base.clone() })?;

    if variants.is_empty() {
        return Ok(vec![NewBook {
            copies: 1,
            copy_number: Some(copy_label(1, 1)),
            ..base.clone()
        }]);
    }

    ensure_unique(variants.iter().filter_map(|v| v.isbn.as_deref()), "ISBN")?;
    ensure_unique(
        variants.iter().filter_map(|v| v.accession_number.as_deref()),
        "accession number",
    )?;
    ensure_unique(variants.iter().filter_map(|v| v.barcode.as_deref()), "barcode")?;

    let total = variants.len() as u32;
    Ok(variants
        .iter()
        .zip(1..)
        .map(|(ids, index)| NewBook {
            isbn: ids.isbn.clone().or_else(|| base.isbn.clone()),
            accession_number: ids.accession_number.clone(),
            barcode: ids.barcode.clone(),
            copies: total,
            copy_number: Some(copy_label(index, total)),
            ..base.clone()
        })
        .collect())
}

fn ensure_unique<'a>(values: impl Iterator<Item = &'a str>, what: &str) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if !seen.insert(value.to_string()) {
            return Err(Error::validation(format!("Duplicate {} across copies: {}", what, value)));
        }
    }
    Ok(())
}

/// Split a comma-separated identifier list, dropping blanks
pub fn split_identifiers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NewBook {
        NewBook {
            title: "Florante at Laura".to_string(),
            author: "Francisco Balagtas".to_string(),
            call_number: Some("PL 6058.9 B3".to_string()),
            copies: 1,
            ..Default::default()
        }
    }

    fn ids(accession: &str) -> CopyIdentifiers {
        CopyIdentifiers {
            accession_number: Some(accession.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_variants_numbers_copies() {
        let copies = expand_variants(&base(), &[ids("A-1"), ids("A-2"), ids("A-3")]).unwrap();
        assert_eq!(copies.len(), 3);
        assert_eq!(copies[0].copy_number.as_deref(), Some("1 of 3"));
        assert_eq!(copies[2].copy_number.as_deref(), Some("3 of 3"));
        assert_eq!(copies[1].accession_number.as_deref(), Some("A-2"));
        assert!(copies.iter().all(|c| c.title == "Florante at Laura" && c.copies == 3));
    }

    #[test]
    fn test_expand_variants_without_variants() {
        let copies = expand_variants(&base(), &[]).unwrap();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].copy_number.as_deref(), Some("1 of 1"));
    }

    #[test]
    fn test_expand_variants_rejects_duplicates() {
        let err = expand_variants(&base(), &[ids("A-1"), ids("A-1")]).unwrap_err();
        assert!(err.to_string().contains("accession number"));
    }

    #[test]
    fn test_expand_variants_requires_title() {
        let mut book = base();
        book.title = "  ".to_string();
        assert!(expand_variants(&book, &[ids("A-1")]).is_err());
    }

    #[test]
    fn test_validate_new_book_copies() {
        let mut book = base();
        book.copies = 0;
        assert!(validate_new_book(&book).is_err());
    }

    #[test]
    fn test_split_identifiers() {
        assert_eq!(split_identifiers("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_identifiers("").is_empty());
    }
}
