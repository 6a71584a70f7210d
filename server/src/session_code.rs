use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use thiserror::Error;

/// Uppercase letters and digits, minus the letters easily misread as digits.
pub const CODE_ALPHABET: &[u8] = b"ACDEFGHJKMPRTUVWXYZ0123456789";
pub const CODE_LENGTH: usize = 8;
pub const DEFAULT_MAX_ATTEMPTS: usize = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionCodeError {
    #[error("no unused session code found after {0} attempts")]
    Exhausted(usize),
}

/// Draws join codes that are unique among the sessions alive at the time of
/// the draw.
pub struct SessionCodeGenerator<R = OsRng> {
    rng: R,
    max_attempts: usize,
}

impl SessionCodeGenerator<OsRng> {
    pub fn new(max_attempts: usize) -> Self {
        Self::with_rng(OsRng, max_attempts)
    }
}

impl<R: RngCore> SessionCodeGenerator<R> {
    pub fn with_rng(rng: R, max_attempts: usize) -> Self {
        Self { rng, max_attempts }
    }

    pub fn generate<F>(&mut self, mut is_taken: F) -> Result<String, SessionCodeError>
    where
        F: FnMut(&str) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            let code = self.candidate();
            if !is_taken(&code) {
                return Ok(code);
            }
            log::debug!("Session code collision on attempt {}", attempt);
        }
        Err(SessionCodeError::Exhausted(self.max_attempts))
    }

    fn candidate(&mut self) -> String {
        (0..CODE_LENGTH)
            .map(|_| CODE_ALPHABET[self.rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn it_uses_a_29_character_alphabet_without_ambiguous_letters() {
        assert_eq!(CODE_ALPHABET.len(), 29);
        let unique: HashSet<_> = CODE_ALPHABET.iter().collect();
        assert_eq!(unique.len(), 29);
        for ambiguous in b"BILOQS" {
            assert!(!CODE_ALPHABET.contains(ambiguous));
        }
    }

    #[test]
    fn it_generates_well_formed_codes() {
        let mut generator = SessionCodeGenerator::new(DEFAULT_MAX_ATTEMPTS);
        for _ in 0..100 {
            let code = generator.generate(|_| false).expect("");
            assert!(is_well_formed(&code), "{}", code);
        }
    }

    #[test]
    fn it_redraws_on_collision() {
        let mut generator = SessionCodeGenerator::with_rng(StdRng::seed_from_u64(7), 10);
        let mut rejected = Vec::new();
        let code = generator
            .generate(|code| {
                if rejected.len() < 3 {
                    rejected.push(code.to_owned());
                    true
                } else {
                    false
                }
            })
            .expect("");
        assert_eq!(rejected.len(), 3);
        assert!(is_well_formed(&code));
    }

    #[test]
    fn it_never_returns_a_taken_code() {
        let mut generator = SessionCodeGenerator::with_rng(StdRng::seed_from_u64(1), 1000);
        let mut live = HashSet::new();
        for _ in 0..500 {
            let code = generator.generate(|code| live.contains(code)).expect("");
            assert!(live.insert(code));
        }
    }

    #[test]
    fn it_gives_up_after_the_attempt_ceiling() {
        let mut generator = SessionCodeGenerator::with_rng(StdRng::seed_from_u64(3), 5);
        let mut attempts = 0;
        let result = generator.generate(|_| {
            attempts += 1;
            true
        });
        assert_eq!(result, Err(SessionCodeError::Exhausted(5)));
        assert_eq!(attempts, 5);
    }
}
