//! Edit-distance similarity between a recognized transcript and a target word.

/// Lowercases, collapses interior whitespace and strips leading/trailing
/// punctuation so that `"  Hello! "` and `"hello"` compare equal.
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string()
}

/// True when either side normalizes to nothing; such pairs always score 0.0.
pub fn is_degenerate(target: &str, transcript: &str) -> bool {
    normalize(target).is_empty() || normalize(transcript).is_empty()
}

/// Similarity in `[0, 1]`: `1 - distance / max(len)` over normalized inputs.
pub fn score(target: &str, transcript: &str) -> f32 {
    let target: Vec<char> = normalize(target).chars().collect();
    let transcript: Vec<char> = normalize(transcript).chars().collect();

    if target.is_empty() || transcript.is_empty() {
        return 0.0;
    }
    if target == transcript {
        return 1.0;
    }

    let distance = levenshtein(&target, &transcript);
    let longest = target.len().max(transcript.len());
    (1.0 - distance as f32 / longest as f32).clamp(0.0, 1.0)
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0_usize; b.len() + 1];

    for (i, left) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, right) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(left != right);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
