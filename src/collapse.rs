use std::collections::{BTreeMap, HashMap};

use crate::time::Bucket;

/// Most categories a composition chart shows before folding the tail
pub const TOP_K: usize = 10;
pub const OTHERS_LABEL: &str = "Others";
const OTHERS_FALLBACK_LABEL: &str = "Others (collapsed)";

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: String,
    pub bucket: Bucket,
    pub count: usize,
}

/// Per-(bucket, category) counts after top-K collapsing
#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedCounts {
    /// Kept categories by descending global frequency, synthetic label last
    pub categories: Vec<String>,
    /// Rows ordered by bucket, then by category rank
    pub counts: Vec<CategoryCount>,
    /// Number of distinct non-missing values before collapsing
    pub distinct: usize,
    /// Label of the synthetic category when collapsing happened
    pub others_label: Option<String>,
}

impl CollapsedCounts {
    pub fn is_collapsed(&self) -> bool {
        self.others_label.is_some()
    }

    /// Total emitted count for one bucket
    pub fn bucket_total(&self, bucket: Bucket) -> usize {
        self.counts
            .iter()
            .filter(|c| c.bucket == bucket)
            .map(|c| c.count)
            .sum()
    }
}

/// Count category values per bucket, keeping the `k` globally most frequent
/// values and summing the rest into one synthetic category per bucket.
///
/// Missing values (`None`) are ignored. Ties in frequency keep first-seen order.
pub fn collapse_categories<'a>(buckets: &[Bucket], values: &[Option<&'a str>], k: usize) -> CollapsedCounts {
    // 1. Global frequency, remembering first appearance
    let mut first_seen: Vec<&'a str> = Vec::new();
    let mut frequency: HashMap<&'a str, usize> = HashMap::new();
    for value in values.iter().flatten().copied() {
        let entry = frequency.entry(value).or_insert_with(|| {
            first_seen.push(value);
            0
        });
        *entry += 1;
    }

    // 2. Rank (sort_by is stable, so ties stay in first-seen order)
    let mut ranked = first_seen;
    ranked.sort_by(|a, b| frequency[b].cmp(&frequency[a]));
    let distinct = ranked.len();
    let kept: Vec<&str> = ranked.into_iter().take(k).collect();
    let rank_of: HashMap<&str, usize> = kept.iter().enumerate().map(|(i, v)| (*v, i)).collect();

    let others_label = (distinct > k).then(|| others_label_for(&rank_of));

    // 3. Per bucket counts; slot `kept.len()` collects everything outside the top K
    let mut per_bucket: BTreeMap<Bucket, Vec<usize>> = BTreeMap::new();
    for (bucket, value) in buckets.iter().zip(values) {
        let Some(value) = value else { continue };
        let slot = rank_of.get(value).copied().unwrap_or(kept.len());
        per_bucket.entry(*bucket).or_insert_with(|| vec![0; kept.len() + 1])[slot] += 1;
    }

    let mut counts = Vec::new();
    for (bucket, slots) in per_bucket {
        for (category, &count) in kept.iter().zip(&slots) {
            if count > 0 {
                counts.push(CategoryCount {
                    category: category.to_string(),
                    bucket,
                    count,
                });
            }
        }
        if let Some(label) = &others_label {
            let dropped = slots[kept.len()];
            if dropped > 0 {
                counts.push(CategoryCount {
                    category: label.clone(),
                    bucket,
                    count: dropped,
                });
            }
        }
    }

    let mut categories: Vec<String> = kept.iter().map(|v| v.to_string()).collect();
    categories.extend(others_label.clone());

    CollapsedCounts {
        categories,
        counts,
        distinct,
        others_label,
    }
}

/// Synthetic label that does not clash with any kept category
fn others_label_for(kept: &HashMap<&str, usize>) -> String {
    if !kept.contains_key(OTHERS_LABEL) {
        return OTHERS_LABEL.to_string();
    }
    let mut label = OTHERS_FALLBACK_LABEL.to_string();
    while kept.contains_key(label.as_str()) {
        label.push('*');
    }
    label
}
