//! Slicing list results into pages.

use serde::Serialize;
use serde_json::{Map, Value};

/// Cut `data` into pages of `size` and return page `page` as
/// `{<name>: [...], "page", "size", "pages", "total"}`.
///
/// A `size` of zero or less means everything on one page, reported with
/// `size: -1`. `page` is clamped into the valid range, so out-of-range pages
/// return the nearest real one.
///
/// ```rust
/// use sigbind::paginate::paginate;
///
/// let page = paginate(&[1, 2, 3, 4, 5], 1, 2, "items").unwrap();
/// assert_eq!(page["items"], serde_json::json!([3, 4]));
/// assert_eq!(page["pages"], 3);
/// ```
pub fn paginate<T: Serialize>(
    data: &[T],
    page: i64,
    size: i64,
    name: &str,
) -> Result<Map<String, Value>, serde_json::Error> {
    let total = data.len();
    let (size, pages) = if size <= 0 {
        (-1, 1)
    } else {
        (size, i64::try_from(total.div_ceil(size as usize)).unwrap_or(i64::MAX))
    };
    let page = page.min(pages - 1).max(0);

    let items = if size == -1 {
        data
    } else {
        let start = usize::try_from(page.saturating_mul(size)).unwrap_or(usize::MAX).min(total);
        let end = start.saturating_add(size as usize).min(total);
        &data[start..end]
    };

    let mut out = Map::new();
    out.insert(name.to_string(), serde_json::to_value(items)?);
    out.insert("page".to_string(), Value::from(page));
    out.insert("size".to_string(), Value::from(size));
    out.insert("pages".to_string(), Value::from(pages));
    out.insert("total".to_string(), Value::from(total));
    Ok(out)
}
