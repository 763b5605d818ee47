//! Weighted edit distance used by the entity converters.
//!
//! Deletions from the query are expensive and insertions are cheap, so a
//! short query like `bob` prefers `bobby` over `rob`.

/// Cost of deleting a character from the query.
pub const DELETE_COST: u32 = 9;
/// Cost of inserting a character into the query.
pub const INSERT_COST: u32 = 1;
/// Cost of substituting one character for another.
pub const SUBSTITUTE_COST: u32 = 10;

/// Levenshtein distance with custom operation weights.
pub fn levenshtein(s1: &str, s2: &str, w_del: u32, w_ins: u32, w_sub: u32) -> u32 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    let mut prev: Vec<u32> = (0..=b.len() as u32).map(|i| i * w_ins).collect();
    let mut cur = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        cur[0] = (i as u32 + 1) * w_del;
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j]
            } else {
                (w_del + prev[j + 1])
                    .min(w_ins + cur[j])
                    .min(w_sub + prev[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    prev[b.len()]
}

/// Find the closest candidate to `query`.
///
/// Returns `(distance, index)` of the best match, the earliest candidate
/// winning ties, or `None` if there are no candidates.
pub fn fuzzy_match_one<S: AsRef<str>>(query: &str, against: &[S]) -> Option<(u32, usize)> {
    against
        .iter()
        .enumerate()
        .map(|(idx, candidate)| {
            let dist = levenshtein(
                query,
                candidate.as_ref(),
                DELETE_COST,
                INSERT_COST,
                SUBSTITUTE_COST,
            );
            (dist, idx)
        })
        .min_by_key(|&(dist, idx)| (dist, idx))
}
