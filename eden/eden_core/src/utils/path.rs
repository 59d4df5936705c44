//! Lexical path normalization.
//!
//! Descriptors and hook locators are compared by their normalized form, so
//! the normalization here must be total and deterministic: it never touches
//! the file system and never fails.

/// Normalize a path or `file://` URL lexically.
///
/// * `file://` URLs become paths (percent escapes decoded)
/// * back-slashes become `/`
/// * empty and `.` segments are dropped, `..` pops the previous segment
/// * drive letters are upper-cased (`c:\x` becomes `C:/x`)
///
/// `..` never climbs above the root of an absolute path.
pub fn normalize_path(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let mut raw = match strip_file_scheme(trimmed) {
        Some(rest) => percent_decode(rest),
        None => trimmed.to_string(),
    };
    raw = raw.replace('\\', "/");

    // `file:///C:/x` leaves `/C:/x` behind
    if raw.len() >= 3 && raw.starts_with('/') && drive_prefix(&raw[1..]).is_some() {
        raw.remove(0);
    }

    let (root, rest) = if let Some(drive) = drive_prefix(&raw) {
        (format!("{}:/", drive), &raw[2..])
    } else if raw.starts_with('/') {
        ("/".to_string(), &raw[1..])
    } else {
        (String::new(), raw.as_str())
    };
    let absolute = !root.is_empty();

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    if absolute {
        format!("{}{}", root, segments.join("/"))
    } else if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}

/// Whether a normalized path is absolute (`/...` or `X:/...`).
pub fn is_absolute(normalized: &str) -> bool {
    normalized.starts_with('/') || drive_prefix(normalized).is_some()
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve(base: &str, path: &str) -> String {
    let normalized = normalize_path(path);
    if is_absolute(&normalized) {
        normalized
    } else {
        normalize_path(&format!("{}/{}", normalize_path(base), normalized))
    }
}

/// Strict ancestors of a normalized absolute path, nearest first.
///
/// `/a/b/c` yields `/a/b`, `/a`, `/`. Relative paths have no ancestors.
pub fn ancestors(normalized: &str) -> Vec<String> {
    if !is_absolute(normalized) {
        return Vec::new();
    }

    let root_len = if normalized.starts_with('/') { 1 } else { 3 };
    let mut result = Vec::new();
    let mut current = normalized.to_string();
    while current.len() > root_len {
        match current.rfind('/') {
            Some(idx) if idx >= root_len => current.truncate(idx),
            _ => current.truncate(root_len),
        }
        result.push(current.clone());
    }
    result
}

/// The last segment of a normalized path, if any.
pub fn file_name(normalized: &str) -> Option<&str> {
    normalized
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && !name.ends_with(':'))
}

fn strip_file_scheme(input: &str) -> Option<&str> {
    let prefix = input.get(..7)?;
    if prefix.eq_ignore_ascii_case("file://") {
        Some(&input[7..])
    } else {
        None
    }
}

fn drive_prefix(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() || chars.next()? != ':' {
        return None;
    }
    match chars.next() {
        None | Some('/') => Some(letter.to_ascii_uppercase()),
        _ => None,
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(value) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unix_paths() {
        assert_eq!(normalize_path("/etc/passwd"), "/etc/passwd");
        assert_eq!(normalize_path("/etc//./passwd/"), "/etc/passwd");
        assert_eq!(normalize_path("/etc/ssh/../passwd"), "/etc/passwd");
        assert_eq!(normalize_path("/../../etc"), "/etc");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_normalize_windows_paths() {
        assert_eq!(normalize_path(r"c:\Edgeless\Resource"), "C:/Edgeless/Resource");
        assert_eq!(normalize_path("X:"), "X:/");
        assert_eq!(normalize_path(r"X:\a\..\b\"), "X:/b");
    }

    #[test]
    fn test_normalize_file_urls() {
        assert_eq!(normalize_path("file:///etc/passwd"), "/etc/passwd");
        assert_eq!(normalize_path("FILE:///C:/Program%20Files"), "C:/Program Files");
    }

    #[test]
    fn test_normalize_relative_paths() {
        assert_eq!(normalize_path("a/./b/../c"), "a/c");
        assert_eq!(normalize_path("../x"), "../x");
        assert_eq!(normalize_path("a/.."), ".");
        assert_eq!(normalize_path("  "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["/a/b/../c", r"d:\x\y", "file:///tmp/a%2Fb", "rel/../x", ""] {
            let once = normalize_path(input);
            assert_eq!(normalize_path(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("/opt/pkg", "bin/tool"), "/opt/pkg/bin/tool");
        assert_eq!(resolve("/opt/pkg", "/etc/hosts"), "/etc/hosts");
        assert_eq!(resolve("X:/Program Files", "..\\Temp"), "X:/Temp");
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("/a/b/c"), vec!["/a/b", "/a", "/"]);
        assert_eq!(ancestors("C:/a/b"), vec!["C:/a", "C:/"]);
        assert!(ancestors("/").is_empty());
        assert!(ancestors("rel/path").is_empty());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/a/b.txt"), Some("b.txt"));
        assert_eq!(file_name("/"), None);
        assert_eq!(file_name("C:/"), None);
    }
}
