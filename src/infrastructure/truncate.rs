//! String truncation helpers for log output

/// Keep the last `length` bytes of `s`, cutting at the first `delim`
///
/// Strings no longer than `length` are returned unchanged. Otherwise the
/// tail is cut after its first `delim` and prefixed with `"..."` (and the
/// delimiter itself when `prefix_if_cut` is set). A tail without `delim`
/// is returned as `"..." + tail`.
///
/// ```
/// use batch_accumulator::infrastructure::truncate::cut_start;
///
/// assert_eq!(cut_start("handler.worker.flush", 10, ".", false), "...flush");
/// assert_eq!(cut_start("short", 10, ".", false), "short");
/// ```
pub fn cut_start(s: &str, length: usize, delim: &str, prefix_if_cut: bool) -> String {
    if s.len() <= length {
        return s.to_string();
    }

    let mut cut = s.len() - length;
    while !s.is_char_boundary(cut) {
        cut += 1;
    }
    let tail = &s[cut..];

    match tail.split_once(delim) {
        Some((_, rest)) if !delim.is_empty() => {
            if prefix_if_cut {
                format!("...{}{}", delim, rest)
            } else {
                format!("...{}", rest)
            }
        }
        _ => format!("...{}", tail),
    }
}

/// Shorten a path from the front, keeping whole trailing components
#[inline]
pub fn cut_front_path(s: &str, length: usize) -> String {
    cut_start(s, length, "/", true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_string_unchanged() {
        assert_eq!(cut_start("abc", 3, ".", false), "abc");
        assert_eq!(cut_front_path("src/lib.rs", 40), "src/lib.rs");
    }

    #[test]
    fn test_cut_without_delimiter() {
        assert_eq!(cut_start("abcdef", 3, ".", false), "...def");
        assert_eq!(cut_start("abcdef", 3, ".", true), "...def");
    }

    #[test]
    fn test_cut_at_first_delimiter() {
        assert_eq!(cut_start("core.buffer.drain", 12, ".", false), "...drain");
        assert_eq!(cut_start("core.buffer.drain", 12, ".", true), "....drain");
    }

    #[test]
    fn test_cut_front_path() {
        assert_eq!(
            cut_front_path("/home/user/project/src/main.rs", 12),
            ".../src/main.rs"
        );
    }

    #[test]
    fn test_cut_respects_char_boundaries() {
        // "é" is two bytes; a cut in its middle moves forward
        let s = "aé/bc";
        assert_eq!(cut_start(s, 4, "/", true), ".../bc");
    }

    #[test]
    fn test_empty_delimiter() {
        assert_eq!(cut_start("abcdef", 2, "", true), "...ef");
    }
}
