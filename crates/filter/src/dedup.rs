use std::collections::HashSet;

/// Keep the first item for every id, preserving order. Returns the kept
/// items and the number of duplicates dropped.
pub fn dedup_by<T, F>(items: Vec<T>, id: F) -> (Vec<T>, usize)
where
    F: Fn(&T) -> &str,
{
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let total = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| seen.insert(id(item).to_string()))
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}
