//! Corpus slicing and document preparation

mod preparer;

pub use preparer::DocumentPreparer;

use crate::dataset::RawRecord;

/// Personal records kept: the first `min(100, n)` in source order
pub const PERSONAL_TAKE: usize = 100;

/// Vulnerability records kept: the last `min(200, n)` in source order
pub const VULNERABILITY_TAKE: usize = 200;

/// Slice the personal corpus. Deterministic and stable across runs.
pub fn slice_personal(records: &[RawRecord]) -> &[RawRecord] {
    &records[..records.len().min(PERSONAL_TAKE)]
}

/// Slice the vulnerability corpus. Deterministic and stable across runs.
pub fn slice_vulnerability(records: &[RawRecord]) -> &[RawRecord] {
    &records[records.len().saturating_sub(VULNERABILITY_TAKE)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|i| {
                let mut record = RawRecord::new();
                record.insert("ordinal".to_string(), json!(i));
                record
            })
            .collect()
    }

    #[test]
    fn personal_takes_the_first_hundred() {
        let all = records(150);
        let sliced = slice_personal(&all);
        assert_eq!(sliced.len(), 100);
        assert_eq!(sliced[0]["ordinal"], 0);
        assert_eq!(sliced[99]["ordinal"], 99);
    }

    #[test]
    fn vulnerability_takes_the_last_two_hundred() {
        let all = records(250);
        let sliced = slice_vulnerability(&all);
        assert_eq!(sliced.len(), 200);
        assert_eq!(sliced[0]["ordinal"], 50);
        assert_eq!(sliced[199]["ordinal"], 249);
    }

    #[test]
    fn short_corpora_are_kept_whole() {
        let all = records(10);
        assert_eq!(slice_personal(&all).len(), 10);
        assert_eq!(slice_vulnerability(&all).len(), 10);
        assert!(slice_personal(&[]).is_empty());
        assert!(slice_vulnerability(&[]).is_empty());
    }
}
