// ==========================================
// 销售数据仓库 - 自然键去重器
// ==========================================
// 职责: 同一自然键仅保留时效字段最新的一行
// 规则:
// - 自然键为空的行直接剔除
// - 时效字段为空视为最旧
// - 时效相同时保留输入顺序靠前者
// - 输出保持胜出行的原始相对顺序
// ==========================================

use std::collections::HashMap;
use std::hash::Hash;

/// 去重结果
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome<T> {
    pub kept: Vec<T>,
    pub superseded: usize, // 被同键更新行淘汰
    pub null_key: usize,   // 自然键为空被剔除
}

impl<T> DedupOutcome<T> {
    pub fn dropped(&self) -> usize {
        self.superseded + self.null_key
    }
}

pub struct Deduplicator;

impl Deduplicator {
    /// 每个自然键保留最新一行
    ///
    /// # 参数
    /// - rows: 输入行（按源文件顺序）
    /// - key_fn: 提取自然键，None 表示缺键
    /// - recency_fn: 提取时效字段，None 排在最旧
    pub fn latest_per_key<T, K, R, FK, FR>(
        &self,
        rows: Vec<T>,
        key_fn: FK,
        recency_fn: FR,
    ) -> DedupOutcome<T>
    where
        K: Eq + Hash,
        R: Ord,
        FK: Fn(&T) -> Option<K>,
        FR: Fn(&T) -> Option<R>,
    {
        let mut winners: HashMap<K, usize> = HashMap::new();
        let mut null_key = 0;

        for (idx, row) in rows.iter().enumerate() {
            let key = match key_fn(row) {
                Some(k) => k,
                None => {
                    null_key += 1;
                    continue;
                }
            };

            match winners.get_mut(&key) {
                Some(best) => {
                    // Option 排序中 None < Some，严格大于保证平局时先到者胜出
                    if recency_fn(row) > recency_fn(&rows[*best]) {
                        *best = idx;
                    }
                }
                None => {
                    winners.insert(key, idx);
                }
            }
        }

        let mut keep = vec![false; rows.len()];
        for idx in winners.values() {
            keep[*idx] = true;
        }

        let with_key = rows.len() - null_key;
        let kept: Vec<T> = rows
            .into_iter()
            .zip(keep)
            .filter_map(|(row, k)| k.then_some(row))
            .collect();
        let superseded = with_key - kept.len();

        DedupOutcome {
            kept,
            superseded,
            null_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: Option<i64>,
        at: Option<NaiveDate>,
        tag: &'static str,
    }

    fn row(id: Option<i64>, at: Option<(i32, u32, u32)>, tag: &'static str) -> Row {
        Row {
            id,
            at: at.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            tag,
        }
    }

    fn dedup(rows: Vec<Row>) -> DedupOutcome<Row> {
        Deduplicator.latest_per_key(rows, |r| r.id, |r| r.at)
    }

    #[test]
    fn test_keeps_latest_per_key() {
        let outcome = dedup(vec![
            row(Some(29466), Some((2026, 1, 25)), "old"),
            row(Some(29466), Some((2026, 1, 27)), "new"),
            row(Some(29467), Some((2026, 1, 1)), "other"),
        ]);

        let tags: Vec<_> = outcome.kept.iter().map(|r| r.tag).collect();
        assert_eq!(tags, vec!["new", "other"]);
        assert_eq!(outcome.superseded, 1);
        assert_eq!(outcome.null_key, 0);
    }

    #[test]
    fn test_drops_null_keys() {
        let outcome = dedup(vec![
            row(None, Some((2026, 1, 25)), "a"),
            row(Some(1), None, "b"),
        ]);

        assert_eq!(outcome.kept.len(), 1);
        assert_eq!(outcome.null_key, 1);
        assert_eq!(outcome.dropped(), 1);
    }

    #[test]
    fn test_tie_keeps_first_in_input_order() {
        let outcome = dedup(vec![
            row(Some(1), Some((2026, 1, 1)), "first"),
            row(Some(1), Some((2026, 1, 1)), "second"),
        ]);

        assert_eq!(outcome.kept[0].tag, "first");
    }

    #[test]
    fn test_null_recency_ranks_lowest() {
        let outcome = dedup(vec![
            row(Some(1), None, "undated"),
            row(Some(1), Some((2000, 1, 1)), "dated"),
            row(Some(2), None, "only"),
        ]);

        let tags: Vec<_> = outcome.kept.iter().map(|r| r.tag).collect();
        assert_eq!(tags, vec!["dated", "only"]);
    }

    #[test]
    fn test_idempotent() {
        let input = vec![
            row(Some(1), Some((2026, 1, 1)), "a"),
            row(Some(1), Some((2026, 2, 1)), "b"),
            row(Some(3), Some((2026, 1, 1)), "c"),
        ];

        let once = dedup(input).kept;
        let twice = dedup(once.clone()).kept;

        assert_eq!(once, twice);
    }
}
