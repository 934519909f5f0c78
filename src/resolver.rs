//! 实体名称解析
//!
//! 在远端候选列表中按名称查找：不区分大小写的子串包含（只检查「候选名包含查询」）。
//! 未给名称时取第一个；给了名称但无匹配时，按 MatchPolicy 决定回退到第一个或返回 None。

/// 可被解析的候选实体（项目 / 模块 / 阶段 / 用户）
pub trait Candidate {
    fn id(&self) -> i64;
    fn display_name(&self) -> &str;
}

/// 显式名称无匹配时的策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// 回退到列表第一个（模块 / 阶段 / 用户）
    FallbackToFirst,
    /// 不回退（项目）
    Strict,
}

/// 解析名称；空列表总是返回 None
pub fn resolve<'a, T: Candidate>(
    candidates: &'a [T],
    query: Option<&str>,
    policy: MatchPolicy,
) -> Option<&'a T> {
    let query = match query {
        Some(q) => q,
        None => return candidates.first(),
    };

    let needle = query.to_lowercase();
    let found = candidates
        .iter()
        .find(|c| c.display_name().to_lowercase().contains(&needle));

    match (found, policy) {
        (Some(c), _) => Some(c),
        (None, MatchPolicy::FallbackToFirst) => candidates.first(),
        (None, MatchPolicy::Strict) => None,
    }
}

/// 两个名称的相似度：相等 1.0，互相包含 0.8，否则按共有词比例 × 0.6
pub fn similarity(a: &str, b: &str) -> f64 {
    let s1 = a.to_lowercase();
    let s2 = b.to_lowercase();

    if s1 == s2 {
        return 1.0;
    }
    if s1.contains(&s2) || s2.contains(&s1) {
        return 0.8;
    }

    let words1: Vec<&str> = s1.split_whitespace().collect();
    let words2: Vec<&str> = s2.split_whitespace().collect();
    let common = words1
        .iter()
        .filter(|w| words2.iter().any(|o| o.contains(*w) || w.contains(o)))
        .count();

    if common > 0 {
        0.6 * (common as f64 / words1.len().max(words2.len()) as f64)
    } else {
        0.0
    }
}

/// 相似度最高且大于 0 的候选，仅用于提示，不影响解析结果
pub fn closest<'a, T: Candidate>(candidates: &'a [T], query: &str) -> Option<&'a T> {
    candidates
        .iter()
        .map(|c| (c, similarity(c.display_name(), query)))
        .filter(|(_, score)| *score > 0.0)
        .fold(None, |best: Option<(&T, f64)>, (c, score)| match best {
            Some((_, s)) if s >= score => best,
            _ => Some((c, score)),
        })
        .map(|(c, _)| c)
}
