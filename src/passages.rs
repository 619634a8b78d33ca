use rand::seq::SliceRandom;
use rand::Rng;

/// Built-in practice passages
pub const PASSAGES: &[&str] = &[
    "the quick brown fox jumps over the lazy dog",
    "pack my box with five dozen liquor jugs",
    "how vexingly quick daft zebras jump",
    "sphinx of black quartz judge my vow",
    "a journey of a thousand miles begins with a single step",
    "practice does not make perfect only perfect practice makes perfect",
    "slow is smooth and smooth is fast so keep your eyes on the text",
    "every keystroke counts when you are building muscle memory",
    "rust programs are made of crates and crates are made of modules",
    "type with your fingers resting lightly on the home row keys",
];

pub fn random_passage<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    PASSAGES.choose(rng).copied().unwrap_or(PASSAGES[0])
}

/// Random passage, avoiding `previous` when there is a choice
pub fn next_passage<R: Rng + ?Sized>(rng: &mut R, previous: Option<&str>) -> &'static str {
    let candidates: Vec<&'static str> = PASSAGES
        .iter()
        .copied()
        .filter(|p| Some(*p) != previous)
        .collect();
    candidates
        .choose(rng)
        .copied()
        .unwrap_or_else(|| random_passage(rng))
}
