//! Maximal Marginal Relevance (MMR) re-ranking.
//!
//! MMR balances relevance against redundancy among the results already chosen:
//! MMR = λ × sim(query, doc) - (1-λ) × max(sim(doc, selected))
//!
//! λ = 1.0: Pure relevance (standard search)
//! λ = 0.5: Balanced relevance + diversity
//! λ = 0.0: Pure diversity

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 indicating
/// orthogonal vectors. Returns 0.0 for mismatched lengths or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Selects up to `k` candidates by MMR.
///
/// `candidates` are `(relevance, vector)` pairs where relevance is the
/// candidate's similarity to the query. Returns indices into `candidates` in
/// selection order; each index appears at most once.
pub fn select(candidates: &[(f32, &[f32])], k: usize, lambda: f32) -> Vec<usize> {
    let k = k.min(candidates.len());
    let mut selected: Vec<usize> = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;

        for (position, &index) in remaining.iter().enumerate() {
            let (relevance, vector) = candidates[index];
            let redundancy = selected
                .iter()
                .map(|&chosen| cosine_similarity(vector, candidates[chosen].1))
                .fold(None, |max: Option<f32>, sim| Some(max.map_or(sim, |m| m.max(sim))))
                .unwrap_or(0.0);

            let score = lambda * relevance - (1.0 - lambda) * redundancy;
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((position, score));
            }
        }

        match best {
            Some((position, _)) => selected.push(remaining.remove(position)),
            None => break,
        }
    }

    selected
}
