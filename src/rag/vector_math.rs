use ndarray::ArrayView1;

use super::store::StoreError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, StoreError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(StoreError::EmptyVector);
    }
    if query.len() != candidate.len() {
        return Err(StoreError::DimensionMismatch {
            expected: query.len(),
            actual: candidate.len(),
        });
    }

    let query = ArrayView1::from(query);
    let candidate = ArrayView1::from(candidate);

    let dot = query.dot(&candidate);
    let denom = query.dot(&query).sqrt() * candidate.dot(&candidate).sqrt();
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Scores every candidate against `query` and returns `(index, score)` pairs,
/// best first. Ties keep candidate order.
pub fn rank_by_cosine<'a, I>(query: &[f32], candidates: I) -> Result<Vec<(usize, f32)>, StoreError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut ranked = candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| cosine_similarity(query, candidate).map(|score| (idx, score)))
        .collect::<Result<Vec<_>, _>>()?;

    ranked.sort_by(|left, right| right.1.total_cmp(&left.1));
    Ok(ranked)
}
