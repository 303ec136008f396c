/// Path identity keys.
///
/// The scanner may report the same directory as `C:\Users\me`, `c:/users/me/`
/// or `C:\\Users\me`. Every identity comparison in the engine goes through
/// [`normalize_path`] so all of these map to a single key.

/// Characters of the identity key for `path`, produced lazily.
fn key_chars(path: &str) -> impl Iterator<Item = char> + '_ {
    let is_sep = |c: char| c == '/' || c == '\\';
    let lead = path.starts_with(is_sep).then_some('/');
    let body = path
        .split(is_sep)
        .filter(|s| !s.is_empty() && *s != ".")
        .enumerate()
        .flat_map(|(i, segment)| {
            (i > 0)
                .then_some('/')
                .into_iter()
                .chain(segment.chars().flat_map(char::to_lowercase))
        });
    lead.into_iter().chain(body)
}

/// Normalise a path string into its identity key.
///
/// - both `/` and `\` are separators; runs of separators collapse to one
/// - `.` segments and trailing separators are dropped
/// - a leading separator (Unix root, UNC prefix) is kept as a single `/`
/// - the result is lowercased
pub fn normalize_path(path: &str) -> String {
    key_chars(path).collect()
}

/// `true` if `path` normalises to `key`, without allocating.
///
/// `key` must already be the output of [`normalize_path`].
pub fn matches_key(path: &str, key: &str) -> bool {
    key_chars(path).eq(key.chars())
}

/// `true` if two raw path strings refer to the same node.
pub fn same_path(a: &str, b: &str) -> bool {
    normalize_path(a) == normalize_path(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_are_interchangeable() {
        assert_eq!(normalize_path(r"C:\Users\me"), "c:/users/me");
        assert_eq!(normalize_path("C:/Users/me"), "c:/users/me");
        assert_eq!(normalize_path(r"C:\Users/me"), "c:/users/me");
    }

    #[test]
    fn case_is_ignored() {
        assert!(same_path("/Data/Photos", "/data/PHOTOS"));
    }

    #[test]
    fn trailing_and_repeated_separators_collapse() {
        assert_eq!(normalize_path("/var//log/"), "/var/log");
        assert_eq!(normalize_path(r"C:\\Temp\\"), "c:/temp");
        assert_eq!(normalize_path("/var/./log"), "/var/log");
    }

    #[test]
    fn root_forms() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(r"C:\"), "c:");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn matches_key_agrees_with_normalize() {
        let key = normalize_path(r"C:\Users\Me\");
        assert!(matches_key("c:/users/me", &key));
        assert!(matches_key(r"C:\\Users\.\ME", &key));
        assert!(!matches_key("c:/users/me2", &key));
        assert!(!matches_key("c:/users", &key));
        assert!(matches_key("/", "/"));
    }

    #[test]
    fn distinct_paths_stay_distinct() {
        assert!(!same_path("/a/b", "/a/bc"));
        assert!(!same_path("/a/b", "a/b"));
    }
}
