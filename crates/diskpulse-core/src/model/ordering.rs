/// Sibling ordering policy.
///
/// Directories first, then by resolved size descending, unresolved sizes last
/// within their kind, then by name. Applied every time a sibling list is
/// rebuilt; lists that are already in order are handed back untouched.
use super::entry::{Children, DirectoryEntry, NodeRef};
use std::cmp::Ordering;
use std::sync::Arc;

/// Total order over two siblings.
pub fn compare_siblings(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_dir()
        .cmp(&a.is_dir())
        .then_with(|| compare_sizes(a.size, b.size))
        .then_with(|| compare_names(&a.name, &b.name))
        .then_with(|| a.path.cmp(&b.path))
}

/// Descending by size, `None` after every `Some`.
fn compare_sizes(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-insensitive name order with a case-sensitive tie-break, so
/// `"readme"` and `"README"` still have a fixed relative position.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| a.cmp(b))
}

/// `true` if `list` already satisfies the policy.
pub fn is_ordered(list: &[NodeRef]) -> bool {
    list.windows(2)
        .all(|pair| compare_siblings(&pair[0], &pair[1]) != Ordering::Greater)
}

/// Sort a freshly built sibling list into a shared [`Children`] list.
pub fn order_siblings(mut list: Vec<NodeRef>) -> Children {
    list.sort_by(|a, b| compare_siblings(a, b));
    list.into()
}

/// Return `list` itself when it is already ordered, otherwise a sorted copy.
pub fn ensure_ordered(list: &Children) -> Children {
    if is_ordered(list) {
        Arc::clone(list)
    } else {
        order_siblings(list.to_vec())
    }
}
