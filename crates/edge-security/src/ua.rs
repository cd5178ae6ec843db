//! User-Agent signature matching.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Version reported when a pattern has no (matched) capture group.
pub const VERSION_UNKNOWN: &str = "N/A";

/// A configured pattern before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UaPatternRule {
    /// Regular expression, matched case-insensitively.
    pub pattern: String,
    /// Client type reported on match.
    #[serde(rename = "type", default = "custom_type")]
    pub client_type: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

fn custom_type() -> String {
    "custom".to_string()
}

impl UaPatternRule {
    /// Create a pattern rule.
    pub fn new(
        pattern: impl Into<String>,
        client_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            client_type: client_type.into(),
            description: description.into(),
        }
    }

    /// A pattern from a comma-separated list entry.
    pub fn custom(pattern: &str) -> Self {
        Self::new(pattern, custom_type(), format!("Custom pattern: {pattern}"))
    }
}

/// Built-in patterns: OkHttp with a version, then any OkHttp.
pub fn default_patterns() -> Vec<UaPatternRule> {
    vec![
        UaPatternRule::new(r"okhttp/([\d.]+)", "okhttp", "OkHttp library with version"),
        UaPatternRule::new("okhttp", "okhttp-legacy", "Legacy OkHttp without version"),
    ]
}

/// Where a pattern list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSource {
    Defaults,
    Json,
    CommaSeparated,
}

/// Parse a configured pattern list.
///
/// JSON (an array of `{pattern, type, description}`) is tried first, then
/// a comma-separated list of bare expressions. Absent or blank input
/// yields the defaults.
pub fn parse_pattern_config(raw: Option<&str>) -> (Vec<UaPatternRule>, PatternSource) {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return (default_patterns(), PatternSource::Defaults),
    };

    if let Ok(rules) = serde_json::from_str::<Vec<UaPatternRule>>(raw) {
        return (rules, PatternSource::Json);
    }

    let rules = raw
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(UaPatternRule::custom)
        .collect();
    (rules, PatternSource::CommaSeparated)
}

/// Pattern compilation errors.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid regex pattern \"{pattern}\": {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A successful User-Agent match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMatch {
    /// Client type of the matching pattern.
    pub client_type: String,
    /// First capture group, or [`VERSION_UNKNOWN`].
    pub version: String,
    /// Description of the matching pattern.
    pub description: String,
}

#[derive(Debug)]
struct CompiledPattern {
    rule: UaPatternRule,
    regex: Regex,
}

/// Ordered pattern list; the first match wins.
#[derive(Debug)]
pub struct UaPatternSet {
    patterns: Vec<CompiledPattern>,
    rejected: Vec<PatternError>,
}

impl UaPatternSet {
    /// Compile patterns, skipping any that fail to compile.
    pub fn compile(rules: Vec<UaPatternRule>) -> Self {
        let mut patterns = Vec::with_capacity(rules.len());
        let mut rejected = Vec::new();

        for rule in rules {
            match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                Ok(regex) => patterns.push(CompiledPattern { rule, regex }),
                Err(source) => rejected.push(PatternError::InvalidRegex {
                    pattern: rule.pattern,
                    source,
                }),
            }
        }

        Self { patterns, rejected }
    }

    /// Compile the configured list (see [`parse_pattern_config`]).
    pub fn from_config(raw: Option<&str>) -> Self {
        Self::compile(parse_pattern_config(raw).0)
    }

    /// Patterns skipped because they did not compile.
    pub fn rejected(&self) -> &[PatternError] {
        &self.rejected
    }

    /// Number of usable patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether no pattern is usable.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match a User-Agent against the patterns in order.
    pub fn match_user_agent(&self, user_agent: &str) -> Option<ClientMatch> {
        if user_agent.is_empty() {
            return None;
        }

        self.patterns.iter().find_map(|p| {
            let captures = p.regex.captures(user_agent)?;
            let version = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| VERSION_UNKNOWN.to_string());
            Some(ClientMatch {
                client_type: p.rule.client_type.clone(),
                version,
                description: p.rule.description.clone(),
            })
        })
    }
}

impl Default for UaPatternSet {
    fn default() -> Self {
        Self::compile(default_patterns())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_patterns_extract_version() {
        let set = UaPatternSet::default();
        let m = set.match_user_agent("okhttp/4.9.3").unwrap();
        assert_eq!(m.client_type, "okhttp");
        assert_eq!(m.version, "4.9.3");
    }

    #[test]
    fn test_first_match_wins_and_case_insensitive() {
        let set = UaPatternSet::default();
        let m = set.match_user_agent("Dalvik OKHTTP").unwrap();
        assert_eq!(m.client_type, "okhttp-legacy");
        assert_eq!(m.version, VERSION_UNKNOWN);
    }

    #[test]
    fn test_no_match_and_empty_agent() {
        let set = UaPatternSet::default();
        assert!(set.match_user_agent("Mozilla/5.0").is_none());

        let anything = UaPatternSet::compile(vec![UaPatternRule::custom(".*")]);
        assert!(anything.match_user_agent("").is_none());
    }

    #[test]
    fn test_unmatched_capture_group_reports_unknown() {
        let set = UaPatternSet::compile(vec![UaPatternRule::custom(r"myapp(?:/(\d+))?")]);
        assert_eq!(set.match_user_agent("MyApp").unwrap().version, VERSION_UNKNOWN);
        assert_eq!(set.match_user_agent("myapp/7").unwrap().version, "7");
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let set = UaPatternSet::compile(vec![
            UaPatternRule::custom("broken("),
            UaPatternRule::custom("curl"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rejected().len(), 1);
        assert!(set.rejected()[0].to_string().contains("broken("));
        assert!(set.match_user_agent("curl/8.0").is_some());
    }

    // === Configuration parsing ===

    #[test]
    fn test_parse_json_config() {
        let raw = r#"[
            {"pattern": "ios-app/(\\d+)", "type": "ios", "description": "iOS app"},
            {"pattern": "bot"}
        ]"#;
        let (rules, source) = parse_pattern_config(Some(raw));
        assert_eq!(source, PatternSource::Json);
        assert_eq!(rules[0].client_type, "ios");
        assert_eq!(rules[1].client_type, "custom");
        assert_eq!(rules[1].description, "");
    }

    #[test]
    fn test_parse_comma_separated_config() {
        let (rules, source) = parse_pattern_config(Some(" okhttp , ,curl/(\\d+)"));
        assert_eq!(source, PatternSource::CommaSeparated);
        assert_eq!(
            rules,
            vec![UaPatternRule::custom("okhttp"), UaPatternRule::custom(r"curl/(\d+)")]
        );
        assert_eq!(rules[0].description, "Custom pattern: okhttp");
    }

    #[test]
    fn test_parse_absent_config_uses_defaults() {
        assert_eq!(parse_pattern_config(None), (default_patterns(), PatternSource::Defaults));
        assert_eq!(parse_pattern_config(Some("  ")).1, PatternSource::Defaults);
    }
}
