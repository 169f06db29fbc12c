//! Per-file compression policy: skip patterns, algorithm rules, auto-tuning.

use regex::Regex;

use squeezefs_codec::Algorithm;

use crate::config::Config;
use crate::error::OverlayError;

/// Auto-tune crossover between "large" and "very large" inputs.
const AUTO_TUNE_BIG_FILE: u64 = 10 * 1024 * 1024;

/// Outcome of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Algorithm to apply.
    pub algorithm: Algorithm,
    /// Level to apply, already resolved against rule defaults.
    pub level: i32,
    /// True when no rule matched and the configured defaults (possibly
    /// auto-tuned) were used.
    pub used_defaults: bool,
}

struct CompiledRule {
    pattern: Regex,
    algorithm: Algorithm,
    level: i32,
}

/// Compiled policy state. Built once at overlay construction; a malformed
/// pattern fails construction synchronously.
pub struct Policy {
    skip: Option<Regex>,
    rules: Vec<CompiledRule>,
}

impl Policy {
    pub fn new(config: &Config) -> Result<Policy, OverlayError> {
        let skip = if config.skip_patterns.is_empty() {
            None
        } else {
            // Single alternation so every lookup is one regex scan.
            let joined = format!("(?:{})", config.skip_patterns.join("|"));
            Some(compile(&joined)?)
        };

        let mut rules = Vec::with_capacity(config.algorithm_rules.len());
        for rule in &config.algorithm_rules {
            rules.push(CompiledRule {
                pattern: compile(&rule.pattern)?,
                algorithm: rule.algorithm,
                level: rule.level,
            });
        }

        Ok(Policy { skip, rules })
    }

    /// True when the file must be stored verbatim.
    pub fn should_skip(&self, name: &str) -> bool {
        self.skip.as_ref().is_some_and(|re| re.is_match(name))
    }

    /// Choose algorithm and level for `name`.
    ///
    /// Rules are consulted in configured order and the first match wins; a
    /// negative rule level resolves to the algorithm's default, while zero
    /// and above pass through verbatim. Without a match the configured
    /// defaults apply, lowered by the auto-tune table for inputs at or
    /// above the size threshold. `known_size` of zero means "size not yet
    /// known" and disables auto-tuning.
    pub fn select(&self, config: &Config, name: &str, known_size: u64) -> Selection {
        for rule in &self.rules {
            if rule.pattern.is_match(name) {
                let level = if rule.level < 0 {
                    rule.algorithm.default_level()
                } else {
                    rule.level
                };
                return Selection {
                    algorithm: rule.algorithm,
                    level,
                    used_defaults: false,
                };
            }
        }

        let algorithm = config.algorithm;
        let mut level = config.level;
        if config.enable_auto_tuning && known_size > 0 {
            level = auto_tune_level(config, algorithm, known_size);
        }

        Selection {
            algorithm,
            level,
            used_defaults: true,
        }
    }
}

fn compile(pattern: &str) -> Result<Regex, OverlayError> {
    Regex::new(pattern).map_err(|source| OverlayError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Size-banded level reduction. The constants are hand-tuned; below the
/// configured threshold the configured level is kept.
fn auto_tune_level(config: &Config, algo: Algorithm, size: u64) -> i32 {
    if size < config.auto_tune_size_threshold {
        return config.level;
    }
    let big = size > AUTO_TUNE_BIG_FILE;
    match algo {
        Algorithm::Gzip => {
            if big {
                3
            } else {
                4
            }
        }
        Algorithm::Zstd => {
            if big {
                1
            } else {
                2
            }
        }
        Algorithm::Brotli => {
            if big {
                3
            } else {
                4
            }
        }
        Algorithm::Lz4 => 1,
        Algorithm::Snappy => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlgorithmRule;

    fn config_with(rules: Vec<AlgorithmRule>) -> Config {
        Config {
            algorithm_rules: rules,
            ..Config::default()
        }
    }

    #[test]
    fn no_rules_uses_defaults() {
        let cfg = Config::default();
        let policy = Policy::new(&cfg).unwrap();
        let sel = policy.select(&cfg, "anything.txt", 0);
        assert_eq!(sel.algorithm, Algorithm::Zstd);
        assert_eq!(sel.level, 3);
        assert!(sel.used_defaults);
    }

    #[test]
    fn first_rule_wins() {
        let cfg = config_with(vec![
            AlgorithmRule::new(r"important\.log$", Algorithm::Brotli, 11),
            AlgorithmRule::new(r"\.log$", Algorithm::Lz4, 0),
        ]);
        let policy = Policy::new(&cfg).unwrap();

        let sel = policy.select(&cfg, "important.log", 0);
        assert_eq!(sel.algorithm, Algorithm::Brotli);
        assert_eq!(sel.level, 11);
        assert!(!sel.used_defaults);

        let sel = policy.select(&cfg, "other.log", 0);
        assert_eq!(sel.algorithm, Algorithm::Lz4);
        assert_eq!(sel.level, 0);
        assert!(!sel.used_defaults);
    }

    #[test]
    fn negative_rule_level_resolves_to_default() {
        let cfg = config_with(vec![AlgorithmRule::new(r"\.json$", Algorithm::Gzip, -1)]);
        let policy = Policy::new(&cfg).unwrap();
        let sel = policy.select(&cfg, "data.json", 0);
        assert_eq!(sel.level, 6);
    }

    #[test]
    fn auto_tune_crossover() {
        let cfg = Config {
            algorithm: Algorithm::Zstd,
            level: 9,
            enable_auto_tuning: true,
            auto_tune_size_threshold: 1024 * 1024,
            ..Config::default()
        };
        let policy = Policy::new(&cfg).unwrap();

        assert_eq!(policy.select(&cfg, "f", 512 * 1024).level, 9);
        assert_eq!(policy.select(&cfg, "f", 2 * 1024 * 1024).level, 2);
        assert_eq!(policy.select(&cfg, "f", 20 * 1024 * 1024).level, 1);
    }

    #[test]
    fn auto_tune_never_raises_above_band() {
        let cfg = Config {
            algorithm: Algorithm::Gzip,
            level: 6,
            enable_auto_tuning: true,
            ..Config::default()
        };
        let policy = Policy::new(&cfg).unwrap();
        for size in [1 << 20, 5 << 20, 11 << 20, 1 << 30] {
            let sel = policy.select(&cfg, "big.bin", size);
            assert!(sel.level <= 6, "size {size} raised level to {}", sel.level);
        }
    }

    #[test]
    fn rules_take_priority_over_auto_tune() {
        let cfg = Config {
            enable_auto_tuning: true,
            algorithm_rules: vec![AlgorithmRule::new(r"\.db$", Algorithm::Zstd, 19)],
            ..Config::default()
        };
        let policy = Policy::new(&cfg).unwrap();
        let sel = policy.select(&cfg, "huge.db", 100 << 20);
        assert_eq!(sel.level, 19);
        assert!(!sel.used_defaults);
    }

    #[test]
    fn skip_patterns_match_anywhere() {
        let cfg = Config {
            skip_patterns: vec![r"\.jpg$".to_string(), r"\.png$".to_string()],
            ..Config::default()
        };
        let policy = Policy::new(&cfg).unwrap();
        assert!(policy.should_skip("photos/cat.jpg"));
        assert!(policy.should_skip("logo.png"));
        assert!(!policy.should_skip("notes.txt"));
    }

    #[test]
    fn invalid_pattern_fails_construction() {
        let cfg = Config {
            skip_patterns: vec![r"([unclosed".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            Policy::new(&cfg),
            Err(OverlayError::InvalidPattern { .. })
        ));

        let cfg = config_with(vec![AlgorithmRule::new(r"*bad", Algorithm::Lz4, 0)]);
        assert!(Policy::new(&cfg).is_err());
    }
}
