//! Brute force enumeration by name prefix.

use super::registry::RequestKind;
use super::CoreRetrieval;
use guildfetch_api::*;

/// Every string over an alphabet, shortest first, up to a maximum length.
///
/// Candidates are produced lazily by counting in base `alphabet.len()`,
/// so memory use does not depend on the depth.
#[derive(Debug, Clone)]
pub(super) struct Candidates {
    alphabet: Vec<char>,
    depth: usize,
    digits: Vec<usize>,
}

impl Candidates {
    pub(super) fn new(alphabet: &str, depth: u8) -> Self {
        let mut out = Self {
            alphabet: alphabet.chars().collect(),
            depth: depth as usize,
            digits: Vec::new(),
        };
        out.restart();
        out
    }

    /// Start over from the first candidate.
    pub(super) fn restart(&mut self) {
        self.digits = if self.alphabet.is_empty() || self.depth == 0 {
            Vec::new()
        } else {
            vec![0]
        };
    }

    fn advance(&mut self) {
        for d in self.digits.iter_mut().rev() {
            *d += 1;
            if *d < self.alphabet.len() {
                return;
            }
            *d = 0;
        }

        let len = self.digits.len() + 1;
        self.digits = if len > self.depth {
            Vec::new()
        } else {
            vec![0; len]
        };
    }
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if self.digits.is_empty() {
            return None;
        }

        let out = self.digits.iter().map(|d| self.alphabet[*d]).collect();
        self.advance();
        Some(out)
    }
}

/// [Candidates] without any string under a prefix recorded as empty.
#[derive(Debug)]
pub(super) struct Pruned {
    candidates: Candidates,
    empty: Vec<String>,
}

impl Pruned {
    pub(super) fn new(candidates: Candidates) -> Self {
        Self {
            candidates,
            empty: Vec::new(),
        }
    }

    /// No member name starts with `prefix`.
    pub(super) fn record_empty(&mut self, prefix: String) {
        self.empty.push(prefix);
    }
}

impl Iterator for Pruned {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let empty = &self.empty;
        self.candidates
            .by_ref()
            .find(|c| !empty.iter().any(|p| c.starts_with(p.as_str())))
    }
}

impl CoreRetrieval {
    /// Query every candidate prefix in turn, throttled, until the search
    /// space is exhausted or the store holds the known member count.
    pub(super) async fn bruteforce(
        &self,
        options: BruteforceOptions,
    ) -> GfResult<MemberMap> {
        options.validate()?;

        let limit = options.limit.unwrap_or(self.config.bruteforce_limit);
        let depth = options.depth.unwrap_or(self.config.bruteforce_depth);

        let min_delay = self.config.bruteforce_min_delay();
        let mut delay =
            options.delay.unwrap_or_else(|| self.config.bruteforce_delay());
        if delay < min_delay {
            tracing::warn!(
                ?delay,
                ?min_delay,
                "brute force delay below the safe minimum, using the minimum"
            );
            delay = min_delay;
        }

        if depth > 2 {
            tracing::warn!(
                depth,
                alphabet_len = self.config.bruteforce_alphabet.chars().count(),
                "brute force depth above 2 issues a very large number of \
                 queries"
            );
        }

        let mut candidates = Pruned::new(Candidates::new(
            &self.config.bruteforce_alphabet,
            depth,
        ));
        let mut out = MemberMap::new();
        let mut queried = 0_u32;

        while let Some(candidate) = candidates.next() {
            let member_count = self.member_count();
            if member_count > 0
                && self.store.count(self.guild_id()).await? as u64
                    >= member_count
            {
                tracing::debug!(
                    member_count,
                    "member store complete, stopping brute force"
                );
                out.extend(self.store.list(self.guild_id()).await?);
                break;
            }

            if queried > 0 {
                tokio::time::sleep(delay).await;
            }
            queried += 1;

            match self
                .search(
                    &candidate,
                    limit,
                    RequestKind::Bruteforce,
                    &FetchOptions::default(),
                )
                .await
            {
                Ok(found) => {
                    tracing::trace!(
                        %candidate,
                        found = found.len(),
                        "brute force query"
                    );
                    if found.is_empty() {
                        candidates.record_empty(candidate);
                    }
                    out.extend(found);
                }
                Err(GfError::RetrievalTimeout { token }) => {
                    tracing::warn!(
                        %candidate,
                        %token,
                        "brute force query timed out, skipping"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        tracing::warn!(
            queried,
            found = out.len(),
            "brute force enumeration finished, the result may be incomplete"
        );

        Ok(out)
    }
}
