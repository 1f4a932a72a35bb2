pub mod aggregate;
pub mod composite;
pub mod level;
pub mod standardize;

use crate::error::{Result, ScoreError};
use crate::types::answer::AnswerSheet;
use crate::types::instrument::{GroupConfig, Instrument, LevelBasis, Standardization};
use crate::types::result::{FacetScore, GroupScore, TestResult};
use aggregate::{check_answers, contribution_range, sum_items};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// What to do when the sheet does not cover every question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingAnswers {
    /// Fail with `IncompleteAnswers`.
    #[default]
    Reject,
    /// Score anyway; unanswered items count 0 and the result is marked
    /// incomplete.
    Partial,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreOptions {
    pub missing: MissingAnswers,
    pub norm_set: Option<String>,
    /// Timestamp to stamp on the result; now when unset.
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn calculate_scores(
    sheet: &AnswerSheet,
    instrument: &Instrument,
    options: &ScoreOptions,
) -> Result<TestResult> {
    check_answers(sheet, instrument)?;

    let total = instrument.question_count();
    let complete = sheet.len() == total;
    if !complete {
        match options.missing {
            MissingAnswers::Reject => {
                return Err(ScoreError::IncompleteAnswers {
                    answered: sheet.len(),
                    total,
                })
            }
            MissingAnswers::Partial => warn!(
                instrument = %instrument.instrument.id,
                answered = sheet.len(),
                total,
                "scoring incomplete answer sheet; unanswered items count as 0"
            ),
        }
    }

    let norm_set = instrument.resolve_norm_set(options.norm_set.as_deref())?;
    let reversed = instrument.reversed_items();

    let mut groups = instrument
        .groups
        .iter()
        .map(|group| score_group(group, sheet, instrument, &reversed, norm_set.as_deref()))
        .collect::<Result<Vec<_>>>()?;

    let order = composite::assign_ranks(&mut groups);
    let derived = composite::derive(&instrument.composite, &mut groups, &order);
    let categories = composite::categories(&groups);

    info!(
        instrument = %instrument.instrument.id,
        answered = sheet.len(),
        code = derived.as_ref().and_then(|c| c.code()).unwrap_or("-"),
        "scored answer sheet"
    );

    Ok(TestResult {
        instrument: instrument.instrument.id.clone(),
        instrument_name: instrument.instrument.name.clone(),
        instrument_name_en: instrument.instrument.name_en.clone(),
        completed_at: options.completed_at.unwrap_or_else(Utc::now),
        complete,
        norm_set,
        config_sha256: instrument.source_sha256.clone(),
        answers: sheet.answers(),
        groups,
        composite: derived,
        categories,
    })
}

fn score_group(
    group: &GroupConfig,
    sheet: &AnswerSheet,
    instrument: &Instrument,
    reversed: &HashSet<u32>,
    norm_set: Option<&str>,
) -> Result<GroupScore> {
    let scale = &instrument.scale;
    let facets = group
        .facets
        .iter()
        .map(|facet| FacetScore {
            id: facet.id.clone(),
            name: facet.name.clone(),
            name_en: facet.name_en.clone(),
            raw_score: sum_items(&facet.items, sheet, reversed, scale).raw,
            items: facet.items.clone(),
        })
        .collect::<Vec<_>>();

    let items = group.item_numbers();
    let sum = sum_items(&items, sheet, reversed, scale);
    let raw = f64::from(sum.raw);
    let (low, high) = contribution_range(scale);
    let count = items.len() as f64;
    let rescaled = standardize::percentage(raw, count * f64::from(low), count * f64::from(high));

    let (t_score, percentile, sten, percentage) = match (instrument.standardization, norm_set) {
        (Standardization::TScore, Some(set)) => {
            let t = standardize::t_score(raw, instrument.norm(set, &group.id)?);
            (Some(t), Some(standardize::t_score_percentile(t)), None, rescaled)
        }
        (Standardization::Sten, Some(set)) => {
            let sten = standardize::sten(raw, instrument.norm(set, &group.id)?);
            (None, None, Some(sten), standardize::sten_percentage(sten))
        }
        (Standardization::Percentage, _) => (None, None, None, rescaled),
        (_, None) => {
            return Err(ScoreError::InvalidInstrument(format!(
                "{}: standardization needs a norm set",
                instrument.instrument.id
            )))
        }
    };

    let band = instrument.levels.as_ref().and_then(|levels| {
        let value = match levels.basis {
            LevelBasis::Raw => raw,
            LevelBasis::Standard => t_score.map(f64::from).or(sten)?,
            LevelBasis::Percentage => f64::from(percentage),
        };
        level::classify(value, &levels.bands)
    });

    debug!(
        group = %group.id,
        raw = sum.raw,
        answered = sum.answered,
        percentage,
        level = band.map(|band| band.level.as_str()).unwrap_or("-"),
        "scored group"
    );

    Ok(GroupScore {
        id: group.id.clone(),
        name: group.name.clone(),
        name_en: group.name_en.clone(),
        raw_score: sum.raw,
        items: items.len(),
        answered: sum.answered,
        t_score,
        percentile,
        sten,
        percentage,
        level: band.map(|band| band.level.clone()),
        level_label: band.and_then(|band| band.label.clone()),
        interpretation: band.and_then(|band| group.interpretations.get(&band.level).cloned()),
        careers: group.careers.clone(),
        category: group.category.clone(),
        low_label: group.low_label.clone(),
        high_label: group.high_label.clone(),
        rank: 0,
        is_top: false,
        facets,
    })
}
