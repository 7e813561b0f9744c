use globset::{GlobBuilder, GlobMatcher};
use indexmap::IndexMap;
use pgkeep_core::ConstraintKind;
use serde::{Deserialize, Serialize};

use crate::{StandardsError, StandardsResult};

/// Requirements for tables matching one pattern
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRule {
    /// Columns that must exist
    pub required_columns: Vec<String>,
    /// Index suffixes, checked as `{table}_{index}`
    pub required_indexes: Vec<String>,
    /// Constraint name pattern to required kind
    pub required_constraints: IndexMap<String, ConstraintKind>,
    /// Column name to expected data type
    pub column_types: IndexMap<String, String>,
}

impl ValidationRule {
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_indexes<I, S>(mut self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_indexes = indexes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_constraint(mut self, pattern: impl Into<String>, kind: ConstraintKind) -> Self {
        self.required_constraints.insert(pattern.into(), kind);
        self
    }

    pub fn with_column_type(mut self, column: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.column_types.insert(column.into(), data_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.required_columns.is_empty()
            && self.required_indexes.is_empty()
            && self.required_constraints.is_empty()
            && self.column_types.is_empty()
    }
}

/// Which keyed part of a rule two patterns disagreed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictField {
    ColumnType,
    Constraint,
}

/// Two matching rules set the same key to different values.
///
/// The value from the more specific pattern is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleConflict {
    pub field: ConflictField,
    pub key: String,
    pub kept_pattern: String,
    pub kept_value: String,
    pub ignored_pattern: String,
    pub ignored_value: String,
}

/// The union of every rule matching a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedRule {
    /// Matching patterns, most specific first
    pub patterns: Vec<String>,
    pub rule: ValidationRule,
    pub conflicts: Vec<RuleConflict>,
}

struct CompiledRule {
    pattern: String,
    matcher: GlobMatcher,
    rule: ValidationRule,
}

/// Compiled, specificity-ordered validation rules
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("patterns", &self.patterns())
            .finish()
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn literal_len(pattern: &str) -> usize {
    pattern.chars().filter(|c| !matches!(c, '*' | '?')).count()
}

fn compile(pattern: &str) -> Result<GlobMatcher, globset::Error> {
    Ok(GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()?
        .compile_matcher())
}

/// Glob-match `text` against `pattern` (`*` matches any run of characters).
///
/// A pattern that is not a valid glob only matches itself.
pub fn glob_matches(pattern: &str, text: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == text;
    }
    match compile(pattern) {
        Ok(matcher) => matcher.is_match(text),
        Err(_) => pattern == text,
    }
}

impl RuleSet {
    /// Compile rules, ordering them so that literal patterns come first, then
    /// patterns with more literal characters, then by pattern text.
    pub fn new(rules: &IndexMap<String, ValidationRule>) -> StandardsResult<Self> {
        let mut compiled = rules
            .iter()
            .map(|(pattern, rule)| {
                let matcher = compile(pattern).map_err(|e| StandardsError::InvalidRule {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                Ok(CompiledRule {
                    pattern: pattern.clone(),
                    matcher,
                    rule: rule.clone(),
                })
            })
            .collect::<StandardsResult<Vec<_>>>()?;

        compiled.sort_by(|a, b| {
            has_wildcard(&a.pattern)
                .cmp(&has_wildcard(&b.pattern))
                .then_with(|| literal_len(&b.pattern).cmp(&literal_len(&a.pattern)))
                .then_with(|| a.pattern.cmp(&b.pattern))
        });

        Ok(Self { rules: compiled })
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Patterns in evaluation order
    pub fn patterns(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.pattern.as_str()).collect()
    }

    /// Merge every rule matching `table`, or `None` when nothing matches.
    pub fn match_table(&self, table: &str) -> Option<MatchedRule> {
        let mut matched: Option<MatchedRule> = None;
        // Pattern that supplied each keyed value, for conflict reporting.
        let mut type_sources: IndexMap<String, String> = IndexMap::new();
        let mut constraint_sources: IndexMap<String, String> = IndexMap::new();

        for compiled in self.rules.iter().filter(|r| r.matcher.is_match(table)) {
            let merged = matched.get_or_insert_with(MatchedRule::default);
            merged.patterns.push(compiled.pattern.clone());
            let rule = &compiled.rule;

            for column in &rule.required_columns {
                if !merged.rule.required_columns.contains(column) {
                    merged.rule.required_columns.push(column.clone());
                }
            }
            for index in &rule.required_indexes {
                if !merged.rule.required_indexes.contains(index) {
                    merged.rule.required_indexes.push(index.clone());
                }
            }

            for (column, data_type) in &rule.column_types {
                match merged.rule.column_types.get(column) {
                    None => {
                        merged.rule.column_types.insert(column.clone(), data_type.clone());
                        type_sources.insert(column.clone(), compiled.pattern.clone());
                    }
                    Some(kept) if !kept.eq_ignore_ascii_case(data_type) => {
                        merged.conflicts.push(RuleConflict {
                            field: ConflictField::ColumnType,
                            key: column.clone(),
                            kept_pattern: type_sources.get(column).cloned().unwrap_or_default(),
                            kept_value: kept.clone(),
                            ignored_pattern: compiled.pattern.clone(),
                            ignored_value: data_type.clone(),
                        });
                    }
                    Some(_) => {}
                }
            }

            for (name, kind) in &rule.required_constraints {
                match merged.rule.required_constraints.get(name) {
                    None => {
                        merged.rule.required_constraints.insert(name.clone(), *kind);
                        constraint_sources.insert(name.clone(), compiled.pattern.clone());
                    }
                    Some(kept) if kept != kind => {
                        merged.conflicts.push(RuleConflict {
                            field: ConflictField::Constraint,
                            key: name.clone(),
                            kept_pattern: constraint_sources.get(name).cloned().unwrap_or_default(),
                            kept_value: kept.to_string(),
                            ignored_pattern: compiled.pattern.clone(),
                            ignored_value: kind.to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(merged) = &matched {
            for conflict in &merged.conflicts {
                tracing::warn!(
                    table = %table,
                    key = %conflict.key,
                    kept_pattern = %conflict.kept_pattern,
                    ignored_pattern = %conflict.ignored_pattern,
                    "conflicting validation rules, keeping the more specific pattern"
                );
            }
        }

        matched
    }
}
