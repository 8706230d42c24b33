/// `difflib`-style similarity ratio (Ratcliff/Obershelp): twice the total
/// length of matching blocks divided by the combined length of both
/// strings. Used to suggest a schema term for an unmapped field name
/// (§4.8).
#[must_use]
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let matches = matching_length(&a, &b);
    (2.0 * matches as f64) / (a.len() + b.len()) as f64
}

/// Sum of longest-matching-block lengths, recursing on the unmatched
/// left/right remainders — the core of the Ratcliff/Obershelp algorithm.
fn matching_length(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (len, a_start, b_start) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    matching_length(&a[..a_start], &b[..b_start])
        + len
        + matching_length(&a[a_start + len..], &b[b_start + len..])
}

/// Longest common contiguous block between `a` and `b`: `(length,
/// start_in_a, start_in_b)`. Ties broken by earliest start in `a` then `b`,
/// matching `difflib`'s behavior.
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0usize, 0usize, 0usize);
    for ai in 0..a.len() {
        for bi in 0..b.len() {
            let mut len = 0;
            while ai + len < a.len() && bi + len < b.len() && a[ai + len] == b[bi + len] {
                len += 1;
            }
            if len > best.0 {
                best = (len, ai, bi);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_fully_similar() {
        assert_eq!(similarity_ratio("catalogNumber", "catalogNumber"), 1.0);
    }

    #[test]
    fn completely_different_strings_are_dissimilar() {
        assert!(similarity_ratio("abc", "xyz") < 0.1);
    }

    #[test]
    fn close_spellings_score_highly() {
        let ratio = similarity_ratio("catalognum", "catalognumber");
        assert!(ratio > 0.8, "expected high similarity, got {ratio}");
    }

    #[test]
    fn empty_strings_are_identical() {
        assert_eq!(similarity_ratio("", ""), 1.0);
    }
}
