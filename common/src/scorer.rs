//! 商品名の曖昧照合
//!
//! LCS（最長共通部分列）ベースの類似度。販売サイトの商品名は
//! 「剤形・包装数」が後ろに付くことが多いため、短い方の文字列を
//! 長い方の同じ長さの区間に当てた部分一致も評価する。

use crate::types::Candidate;

/// 小文字化・空白の正規化
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// LCS長（2行DP）
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

/// 全体同士の類似度 `2·LCS / (|a|+|b|)`
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    ratio_chars(&a, &b)
}

/// 部分一致の類似度（短い方を長い方の各区間に当てた最大値）
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();
    partial_ratio_chars(&a, &b)
}

fn partial_ratio_chars(a: &[char], b: &[char]) -> f64 {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }
    if short.len() == long.len() {
        return ratio_chars(short, long);
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        best = best.max(ratio_chars(short, window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// 入力名と候補名の類似度（0.0〜1.0）
pub fn score(query_name: &str, candidate_name: &str) -> f64 {
    let q: Vec<char> = normalize(query_name).chars().collect();
    let c: Vec<char> = normalize(candidate_name).chars().collect();
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }

    ratio_chars(&q, &c)
        .max(partial_ratio_chars(&q, &c))
        .clamp(0.0, 1.0)
}

/// 最高スコアの候補を選ぶ（同点は先に出現した方）
pub fn select_best(query_name: &str, candidates: &[Candidate]) -> Option<(Candidate, f64)> {
    let mut best: Option<(&Candidate, f64)> = None;

    for candidate in candidates {
        let s = score(query_name, &candidate.product_name);
        match best {
            Some((_, best_score)) if s <= best_score => {}
            _ => best = Some((candidate, s)),
        }
    }

    best.map(|(candidate, s)| (candidate.clone(), s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn candidate(name: &str, price: i64) -> Candidate {
        Candidate::new(name, BigDecimal::from(price))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Amaryl   1mg\tTablet "), "amaryl 1mg tablet");
    }

    #[test]
    fn test_lcs_len() {
        let a: Vec<char> = "abcde".chars().collect();
        let b: Vec<char> = "ace".chars().collect();
        assert_eq!(lcs_len(&a, &b), 3);
        assert_eq!(lcs_len(&a, &[]), 0);
    }

    #[test]
    fn test_ratio_identical_and_disjoint() {
        assert_eq!(ratio("dolo 650", "DOLO 650"), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_partial_ratio_finds_best_window() {
        // 全体比は低いが、同じ長さの区間に完全一致がある
        assert_eq!(partial_ratio("dolo 650", "Dolo 650 Tablet 15's"), 1.0);
        assert!(ratio("dolo 650", "Dolo 650 Tablet 15's") < 0.7);

        assert_eq!(
            partial_ratio("Amaryl 1mg Tablet", "amaryl"),
            partial_ratio("amaryl", "Amaryl 1mg Tablet")
        );
        assert_eq!(partial_ratio("abc", "xyzxyz"), 0.0);
        assert_eq!(partial_ratio("", "dolo"), 0.0);
    }

    #[test]
    fn test_contained_query_is_exact() {
        let s = score("amaryl 1mg", "Amaryl 1mg Tablet 15's");
        assert!(s > 0.90, "score = {}", s);
    }

    #[test]
    fn test_different_strength_is_not_exact() {
        let s = score("dolo 650", "Dolo 500 Tablet");
        assert!(s < 0.90, "score = {}", s);
        assert!(s >= 0.60, "score = {}", s);
    }

    #[test]
    fn test_unrelated_product_scores_low() {
        let s = score("paracetamol 500mg", "Crocin 500mg Tablet");
        assert!(s > 0.0);
        assert!(s < 0.60, "score = {}", s);
    }

    #[test]
    fn test_empty_strings_score_zero() {
        assert_eq!(score("", "Amaryl"), 0.0);
        assert_eq!(score("amaryl", "   "), 0.0);
    }

    #[test]
    fn test_score_is_symmetric_in_range() {
        let s1 = score("glycomet 500", "Glycomet 500 SR Tablet");
        let s2 = score("Glycomet 500 SR Tablet", "glycomet 500");
        assert_eq!(s1, s2);
        assert!((0.0..=1.0).contains(&s1));
    }

    #[test]
    fn test_select_best_picks_highest() {
        let candidates = vec![
            candidate("Dolo 500 Tablet", 30),
            candidate("Dolo 650 Tablet 15's", 33),
            candidate("Dolonex DT", 80),
        ];
        let (best, s) = select_best("dolo 650", &candidates).unwrap();
        assert_eq!(best.product_name, "Dolo 650 Tablet 15's");
        assert_eq!(s, 1.0);
    }

    #[test]
    fn test_select_best_tie_keeps_first_seen() {
        let candidates = vec![
            candidate("Dolo 650 Tablet", 33),
            candidate("Dolo 650 Tablet", 35),
        ];
        let (best, _) = select_best("dolo 650", &candidates).unwrap();
        assert_eq!(best.price, BigDecimal::from(33));
    }

    #[test]
    fn test_select_best_empty() {
        assert!(select_best("dolo 650", &[]).is_none());
    }
}
