use std::collections::{HashMap, HashSet};

/// Sequences at least this long get their very frequent characters excluded
/// from match seeding.
const POPULAR_MIN_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    pub index: usize,
    pub ratio: f32,
}

/// Gestalt (Ratcliff/Obershelp) similarity: twice the number of characters in
/// the matching blocks over the combined length. Matching blocks come from
/// recursively taking the longest common run and recursing on both sides.
pub fn sequence_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = Matcher::new(&a, &b).matched_chars();
    2.0 * matched as f32 / total as f32
}

/// Best-scoring corpus entry for an already-normalized query. Ties go to the
/// earliest entry. `None` when no entry shares a single character with the
/// query, or the corpus is empty.
pub fn fuzzy_best<S: AsRef<str>>(query: &str, normalized_corpus: &[S]) -> Option<FuzzyMatch> {
    let mut best: Option<FuzzyMatch> = None;
    for (index, entry) in normalized_corpus.iter().enumerate() {
        let ratio = sequence_ratio(query, entry.as_ref());
        if ratio > best.map_or(0.0, |b| b.ratio) {
            best = Some(FuzzyMatch { index, ratio });
        }
    }
    best
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            let popular: HashSet<char> = b2j
                .iter()
                .filter(|(_, idx)| idx.len() > limit)
                .map(|(c, _)| *c)
                .collect();
            b2j.retain(|c, _| !popular.contains(c));
        }

        Self { a, b, b2j }
    }

    /// Longest common run within `a[alo..ahi]` and `b[blo..bhi]`, earliest in
    /// `a` (then `b`) on ties. Returned as `(i, j, size)`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular characters never seed a match but may still extend one.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    fn matched_chars(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }
}
