use crate::error::ScoreError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// A complete instrument definition: question bank, groups, norms, level
/// bands and the rule that derives the composite code.
#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    pub instrument: InstrumentMeta,
    pub scale: ScaleConfig,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub standardization: Standardization,
    #[serde(default)]
    pub norms: BTreeMap<String, BTreeMap<String, Norm>>,
    pub levels: Option<LevelConfig>,
    #[serde(default)]
    pub composite: CompositeRule,
    /// Hex SHA-256 of the definition bytes, filled in by the loader.
    #[serde(skip)]
    pub source_sha256: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: String,
    pub default_norm_set: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScaleConfig {
    pub min: u8,
    pub max: u8,
    #[serde(default)]
    pub contribution: Contribution,
    /// Reverse-scored question numbers.
    #[serde(default)]
    pub reverse: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Contribution {
    /// The (possibly reversed) answer itself.
    #[default]
    Score,
    /// Distance of the answer above the scale minimum.
    AboveMin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub number: u32,
    pub text: Option<String>,
    pub group: Option<String>,
    #[serde(default)]
    pub reverse: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: String,
    #[serde(default)]
    pub items: Vec<u32>,
    #[serde(default)]
    pub facets: Vec<FacetConfig>,
    pub category: Option<String>,
    pub low_label: Option<String>,
    pub high_label: Option<String>,
    /// Interpretation text keyed by level id.
    #[serde(default)]
    pub interpretations: BTreeMap<String, String>,
    /// Suggested occupations for a high score on this group.
    #[serde(default)]
    pub careers: Vec<String>,
}

impl GroupConfig {
    pub fn item_numbers(&self) -> Vec<u32> {
        if self.facets.is_empty() {
            self.items.clone()
        } else {
            self.facets
                .iter()
                .flat_map(|facet| facet.items.iter().copied())
                .collect()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacetConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub name_en: String,
    pub items: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum Standardization {
    #[default]
    Percentage,
    TScore,
    Sten,
}

impl Standardization {
    pub fn needs_norms(self) -> bool {
        matches!(self, Self::TScore | Self::Sten)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Norm {
    pub mean: f64,
    pub sd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub basis: LevelBasis,
    pub bands: Vec<LevelBand>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelBasis {
    #[default]
    Raw,
    /// T-score or sten, whichever the instrument standardizes to.
    Standard,
    Percentage,
}

/// One bucket of an ordered level table. The first band has no lower bound.
#[derive(Debug, Clone, Deserialize)]
pub struct LevelBand {
    pub level: String,
    pub label: Option<String>,
    pub from: Option<f64>,
    /// Start strictly above `from` instead of at it.
    #[serde(default)]
    pub exclusive: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum CompositeRule {
    #[default]
    #[serde(rename = "none")]
    Plain,
    Code {
        length: usize,
    },
    Wing,
    Signature {
        count: usize,
    },
    TopTalents {
        base: usize,
        extended: usize,
        window: u32,
    },
    Dichotomies {
        pairs: Vec<DichotomyConfig>,
        clarity: Vec<LevelBand>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DichotomyConfig {
    pub first: String,
    pub second: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub name_en: String,
}

impl Instrument {
    /// Total lookup of a group by id.
    pub fn group(&self, id: &str) -> Result<&GroupConfig, ScoreError> {
        self.groups
            .iter()
            .find(|group| group.id == id)
            .ok_or_else(|| {
                ScoreError::InvalidInstrument(format!(
                    "{}: unknown group id: {id}",
                    self.instrument.id
                ))
            })
    }

    /// The question bank, synthesized from group items when the file has none.
    pub fn question_bank(&self) -> Vec<Question> {
        if !self.questions.is_empty() {
            return self.questions.clone();
        }
        let mut bank = self
            .groups
            .iter()
            .flat_map(|group| {
                group.item_numbers().into_iter().map(|number| Question {
                    number,
                    text: None,
                    group: Some(group.id.clone()),
                    reverse: false,
                })
            })
            .collect::<Vec<_>>();
        bank.sort_by_key(|question| question.number);
        bank
    }

    pub fn question_count(&self) -> usize {
        self.groups
            .iter()
            .map(|group| group.item_numbers().len())
            .sum()
    }

    pub fn reversed_items(&self) -> HashSet<u32> {
        self.scale
            .reverse
            .iter()
            .copied()
            .chain(
                self.questions
                    .iter()
                    .filter(|question| question.reverse)
                    .map(|question| question.number),
            )
            .collect()
    }

    /// Resolves the norm set to score against: the requested one, else the
    /// file default, else the first set in name order.
    pub fn resolve_norm_set(&self, requested: Option<&str>) -> Result<Option<String>, ScoreError> {
        if !self.standardization.needs_norms() {
            return Ok(None);
        }
        let name = match requested.or(self.instrument.default_norm_set.as_deref()) {
            Some(name) => name.to_string(),
            None => match self.norms.keys().next() {
                Some(name) => name.clone(),
                None => {
                    return Err(ScoreError::InvalidInstrument(format!(
                        "{}: no norm tables defined",
                        self.instrument.id
                    )))
                }
            },
        };
        if !self.norms.contains_key(&name) {
            return Err(ScoreError::UnknownNormSet(name));
        }
        Ok(Some(name))
    }

    pub fn norm(&self, set: &str, group_id: &str) -> Result<Norm, ScoreError> {
        self.norms
            .get(set)
            .and_then(|table| table.get(group_id))
            .copied()
            .ok_or_else(|| {
                ScoreError::InvalidInstrument(format!(
                    "{}: norm set '{set}' has no entry for group '{group_id}'",
                    self.instrument.id
                ))
            })
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        let id = &self.instrument.id;
        let invalid = |message: String| ScoreError::InvalidInstrument(format!("{id}: {message}"));

        if self.scale.min >= self.scale.max {
            return Err(invalid(format!(
                "scale.min ({}) must be below scale.max ({})",
                self.scale.min, self.scale.max
            )));
        }
        if self.groups.is_empty() {
            return Err(invalid("at least one group is required".to_string()));
        }

        let mut group_ids = HashSet::new();
        let mut owner = HashMap::<u32, &str>::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(invalid(format!("duplicate group id: {}", group.id)));
            }
            if !group.items.is_empty() && !group.facets.is_empty() {
                return Err(invalid(format!(
                    "group '{}' cannot list both items and facets",
                    group.id
                )));
            }
            if group.facets.iter().any(|facet| facet.items.is_empty()) {
                return Err(invalid(format!("group '{}' has an empty facet", group.id)));
            }
            let items = group.item_numbers();
            if items.is_empty() {
                return Err(invalid(format!("group '{}' has no items", group.id)));
            }
            for number in items {
                if let Some(existing) = owner.insert(number, group.id.as_str()) {
                    return Err(invalid(format!(
                        "question {number} is assigned to both '{existing}' and '{}'",
                        group.id
                    )));
                }
            }
        }

        if !self.questions.is_empty() {
            let mut seen = HashSet::new();
            for question in &self.questions {
                if !seen.insert(question.number) {
                    return Err(invalid(format!(
                        "question {} appears more than once in the question bank",
                        question.number
                    )));
                }
                match owner.get(&question.number) {
                    None => {
                        return Err(invalid(format!(
                            "question {} is not assigned to any group",
                            question.number
                        )))
                    }
                    Some(group_id) => {
                        if let Some(declared) = &question.group {
                            if declared != group_id {
                                return Err(invalid(format!(
                                    "question {} declares group '{declared}' but is listed under '{group_id}'",
                                    question.number
                                )));
                            }
                        }
                    }
                }
            }
            let mut dangling = owner
                .keys()
                .filter(|number| !seen.contains(number))
                .copied()
                .collect::<Vec<_>>();
            if !dangling.is_empty() {
                dangling.sort_unstable();
                return Err(invalid(format!(
                    "question(s) missing from the question bank: {}",
                    join_numbers(&dangling)
                )));
            }
        }

        let mut unknown_reverse = self
            .scale
            .reverse
            .iter()
            .filter(|number| !owner.contains_key(number))
            .copied()
            .collect::<Vec<_>>();
        if !unknown_reverse.is_empty() {
            unknown_reverse.sort_unstable();
            return Err(invalid(format!(
                "scale.reverse references unknown question(s): {}",
                join_numbers(&unknown_reverse)
            )));
        }

        if self.standardization.needs_norms() {
            if self.norms.is_empty() {
                return Err(invalid(
                    "standardization requires at least one norm set".to_string(),
                ));
            }
            for (set, table) in &self.norms {
                for group in &self.groups {
                    let norm = table.get(&group.id).ok_or_else(|| {
                        invalid(format!(
                            "norm set '{set}' has no entry for group '{}'",
                            group.id
                        ))
                    })?;
                    if !norm.sd.is_finite() || norm.sd <= 0.0 || !norm.mean.is_finite() {
                        return Err(invalid(format!(
                            "norm set '{set}' group '{}' needs a finite mean and sd > 0",
                            group.id
                        )));
                    }
                }
            }
            if let Some(default) = &self.instrument.default_norm_set {
                if !self.norms.contains_key(default) {
                    return Err(invalid(format!(
                        "default_norm_set '{default}' is not defined"
                    )));
                }
            }
        }

        if let Some(levels) = &self.levels {
            validate_bands("levels.bands", &levels.bands).map_err(invalid)?;
            if levels.basis == LevelBasis::Standard && !self.standardization.needs_norms() {
                return Err(invalid(
                    "levels.basis = \"standard\" requires t-score or sten standardization"
                        .to_string(),
                ));
            }
        }

        self.validate_composite().map_err(invalid)
    }

    fn validate_composite(&self) -> Result<(), String> {
        let group_count = self.groups.len();
        match &self.composite {
            CompositeRule::Plain => Ok(()),
            CompositeRule::Wing => {
                if group_count < 3 {
                    return Err("wing rule needs at least three groups".to_string());
                }
                Ok(())
            }
            CompositeRule::Code { length } => {
                if *length == 0 || *length > group_count {
                    return Err(format!(
                        "composite.length must be between 1 and {group_count}"
                    ));
                }
                Ok(())
            }
            CompositeRule::Signature { count } => {
                if *count == 0 || *count > group_count {
                    return Err(format!(
                        "composite.count must be between 1 and {group_count}"
                    ));
                }
                Ok(())
            }
            CompositeRule::TopTalents { base, extended, .. } => {
                if *base == 0 || base > extended || *extended > group_count {
                    return Err(format!(
                        "composite requires 1 <= base <= extended <= {group_count}"
                    ));
                }
                Ok(())
            }
            CompositeRule::Dichotomies { pairs, clarity } => {
                if pairs.is_empty() {
                    return Err("composite.pairs cannot be empty".to_string());
                }
                let mut used = HashSet::new();
                for pair in pairs {
                    for pole in [&pair.first, &pair.second] {
                        if self.group(pole).is_err() {
                            return Err(format!("dichotomy pole '{pole}' is not a group"));
                        }
                        if !used.insert(pole.as_str()) {
                            return Err(format!("dichotomy pole '{pole}' is used twice"));
                        }
                    }
                }
                validate_bands("composite.clarity", clarity)
            }
        }
    }
}

fn validate_bands(path: &str, bands: &[LevelBand]) -> Result<(), String> {
    let Some((first, rest)) = bands.split_first() else {
        return Err(format!("{path} cannot be empty"));
    };
    if first.from.is_some() {
        return Err(format!("{path}: the first band '{}' takes no 'from'", first.level));
    }
    let mut previous: Option<f64> = None;
    for band in rest {
        let Some(from) = band.from else {
            return Err(format!("{path}: band '{}' needs a 'from' bound", band.level));
        };
        if previous.is_some_and(|previous| from <= previous) {
            return Err(format!(
                "{path}: band '{}' must start above the previous band",
                band.level
            ));
        }
        previous = Some(from);
    }
    Ok(())
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Instrument {
        toml::from_str(toml_str).expect("instrument should parse")
    }

    const MINIMAL: &str = r#"
[instrument]
id = "mini"
name = "迷你测试"

[scale]
min = 1
max = 5

[[groups]]
id = "A"
name = "甲"
items = [1, 2]

[[groups]]
id = "B"
name = "乙"
items = [3, 4]
"#;

    #[test]
    fn parse_minimal_instrument_with_defaults() {
        let instrument = parse(MINIMAL);
        assert_eq!(instrument.instrument.id, "mini");
        assert_eq!(instrument.scale.contribution, Contribution::Score);
        assert_eq!(instrument.standardization, Standardization::Percentage);
        assert!(matches!(instrument.composite, CompositeRule::Plain));
        assert!(instrument.validate().is_ok());
    }

    #[test]
    fn synthesized_bank_is_ordered_by_number() {
        let instrument = parse(MINIMAL);
        let numbers = instrument
            .question_bank()
            .iter()
            .map(|question| question.number)
            .collect::<Vec<_>>();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(instrument.question_count(), 4);
    }

    #[test]
    fn group_lookup_fails_on_unknown_id() {
        let instrument = parse(MINIMAL);
        assert_eq!(instrument.group("B").map(|group| group.name.as_str()).ok(), Some("乙"));
        let err = instrument.group("Z").expect_err("unknown id should fail");
        assert!(err.to_string().contains("unknown group id: Z"));
    }

    #[test]
    fn validate_rejects_question_in_two_groups() {
        let instrument = parse(
            r#"
[instrument]
id = "dup"
name = "dup"

[scale]
min = 1
max = 5

[[groups]]
id = "A"
name = "A"
items = [1, 2]

[[groups]]
id = "B"
name = "B"
items = [2, 3]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("question 2 is assigned to both"));
    }

    #[test]
    fn validate_rejects_dangling_bank_reference() {
        let instrument = parse(
            r#"
[instrument]
id = "bank"
name = "bank"

[scale]
min = 1
max = 5

[[questions]]
number = 1
text = "I enjoy parties."

[[groups]]
id = "A"
name = "A"
items = [1, 2]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("missing from the question bank: 2"));
    }

    #[test]
    fn validate_rejects_bank_group_mismatch() {
        let instrument = parse(
            r#"
[instrument]
id = "bank"
name = "bank"

[scale]
min = 1
max = 5

[[questions]]
number = 1
group = "B"

[[groups]]
id = "A"
name = "A"
items = [1]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("declares group 'B'"));
    }

    #[test]
    fn validate_rejects_missing_norm_entry() {
        let instrument = parse(
            r#"
[instrument]
id = "sten"
name = "sten"

[scale]
min = 1
max = 5

[standardization]
method = "sten"

[norms.default]
A = { mean = 30.0, sd = 6.0 }

[[groups]]
id = "A"
name = "A"
items = [1]

[[groups]]
id = "B"
name = "B"
items = [2]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("no entry for group 'B'"));
    }

    #[test]
    fn validate_rejects_zero_sd() {
        let instrument = parse(
            r#"
[instrument]
id = "sd"
name = "sd"

[scale]
min = 1
max = 5

[standardization]
method = "t-score"

[norms.pooled]
A = { mean = 3.0, sd = 0.0 }

[[groups]]
id = "A"
name = "A"
items = [1]
"#,
        );
        assert!(instrument.validate().is_err());
    }

    #[test]
    fn validate_rejects_unordered_bands() {
        let instrument = parse(
            r#"
[instrument]
id = "bands"
name = "bands"

[scale]
min = 1
max = 5

[levels]
bands = [
  { level = "low" },
  { level = "high", from = 8.0 },
  { level = "average", from = 4.0 },
]

[[groups]]
id = "A"
name = "A"
items = [1]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("must start above the previous band"));
    }

    #[test]
    fn validate_rejects_standard_basis_without_norms() {
        let instrument = parse(
            r#"
[instrument]
id = "basis"
name = "basis"

[scale]
min = 1
max = 5

[levels]
basis = "standard"
bands = [{ level = "low" }, { level = "high", from = 3.0 }]

[[groups]]
id = "A"
name = "A"
items = [1]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("requires t-score or sten"));
    }

    #[test]
    fn validate_rejects_unknown_dichotomy_pole() {
        let instrument = parse(
            r#"
[instrument]
id = "poles"
name = "poles"

[scale]
min = 1
max = 5

[composite]
rule = "dichotomies"
pairs = [{ first = "A", second = "Z" }]
clarity = [{ level = "slight" }]

[[groups]]
id = "A"
name = "A"
items = [1]
"#,
        );
        let err = instrument.validate().expect_err("validation should fail");
        assert!(err.to_string().contains("pole 'Z' is not a group"));
    }

    #[test]
    fn validate_rejects_code_longer_than_group_count() {
        let mut instrument = parse(MINIMAL);
        instrument.composite = CompositeRule::Code { length: 3 };
        assert!(instrument.validate().is_err());
        instrument.composite = CompositeRule::Code { length: 2 };
        assert!(instrument.validate().is_ok());
    }

    #[test]
    fn resolve_norm_set_prefers_request_then_default() {
        let instrument = parse(
            r#"
[instrument]
id = "norms"
name = "norms"
default_norm_set = "male"

[scale]
min = 1
max = 5

[standardization]
method = "t-score"

[norms.female]
A = { mean = 3.2, sd = 1.0 }

[norms.male]
A = { mean = 3.0, sd = 1.0 }

[[groups]]
id = "A"
name = "A"
items = [1]
"#,
        );
        assert!(instrument.validate().is_ok());
        assert_eq!(
            instrument.resolve_norm_set(None).expect("default should resolve"),
            Some("male".to_string())
        );
        assert_eq!(
            instrument
                .resolve_norm_set(Some("female"))
                .expect("request should resolve"),
            Some("female".to_string())
        );
        assert!(matches!(
            instrument.resolve_norm_set(Some("pooled")),
            Err(ScoreError::UnknownNormSet(_))
        ));
    }

    #[test]
    fn reversed_items_unions_scale_and_bank_flags() {
        let instrument = parse(
            r#"
[instrument]
id = "rev"
name = "rev"

[scale]
min = 1
max = 5
reverse = [2]

[[questions]]
number = 1

[[questions]]
number = 2

[[questions]]
number = 3
reverse = true

[[groups]]
id = "A"
name = "A"
items = [1, 2, 3]
"#,
        );
        let reversed = instrument.reversed_items();
        assert!(reversed.contains(&2));
        assert!(reversed.contains(&3));
        assert!(!reversed.contains(&1));
    }
}
