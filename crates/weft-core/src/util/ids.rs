//! Record identifier utilities.
//!
//! Every indexed document carries a qualified key combining its document
//! type and primary key, e.g. `product.42`. The qualified form is what the
//! index stores as the unique identity term, so that two document types can
//! reuse the same primary key space without colliding.

/// Build the qualified key for a document.
///
/// # Examples
///
/// ```
/// use weft_core::util::ids::qualified_key;
///
/// assert_eq!(qualified_key("product", "42"), "product.42");
/// assert_eq!(qualified_key("article", "abc-123"), "article.abc-123");
/// ```
pub fn qualified_key(doc_type: &str, key: &str) -> String {
    format!("{doc_type}.{key}")
}

/// Split a qualified key back into `(doc_type, key)`.
///
/// Splits on the first `.` so keys containing dots survive the round trip.
/// Returns `None` if the input has no separator.
///
/// # Examples
///
/// ```
/// use weft_core::util::ids::split_qualified_key;
///
/// assert_eq!(split_qualified_key("product.42"), Some(("product", "42")));
/// assert_eq!(split_qualified_key("article.a.b"), Some(("article", "a.b")));
/// assert_eq!(split_qualified_key("loose"), None);
/// ```
pub fn split_qualified_key(qualified: &str) -> Option<(&str, &str)> {
    qualified.split_once('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_key_simple() {
        assert_eq!(qualified_key("product", "1"), "product.1");
    }

    #[test]
    fn test_split_round_trip() {
        let q = qualified_key("order", "2024-0017");
        assert_eq!(split_qualified_key(&q), Some(("order", "2024-0017")));
    }

    #[test]
    fn test_split_preserves_dotted_keys() {
        assert_eq!(
            split_qualified_key("page.docs/intro.md"),
            Some(("page", "docs/intro.md"))
        );
    }

    #[test]
    fn test_split_rejects_unqualified() {
        assert_eq!(split_qualified_key("noseparator"), None);
    }
}
