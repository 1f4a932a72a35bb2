use crate::error::{Result, ScoreError};
use crate::types::answer::AnswerSheet;
use crate::types::instrument::{Contribution, Instrument, ScaleConfig};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSum {
    pub raw: u32,
    pub answered: usize,
}

/// Mirrors a reverse-keyed answer across the scale: `min + max - score`.
/// Computed in `u32` so scales whose bounds sum past `u8::MAX` still work.
pub fn effective_score(score: u8, reversed: bool, scale: &ScaleConfig) -> u32 {
    if reversed {
        (u32::from(scale.min) + u32::from(scale.max)).saturating_sub(u32::from(score))
    } else {
        u32::from(score)
    }
}

pub fn contribution(score: u8, reversed: bool, scale: &ScaleConfig) -> u32 {
    let effective = effective_score(score, reversed, scale);
    match scale.contribution {
        Contribution::Score => effective,
        Contribution::AboveMin => effective.saturating_sub(u32::from(scale.min)),
    }
}

/// Lowest and highest contribution a single answered item can make.
pub fn contribution_range(scale: &ScaleConfig) -> (u32, u32) {
    match scale.contribution {
        Contribution::Score => (u32::from(scale.min), u32::from(scale.max)),
        Contribution::AboveMin => (0, u32::from(scale.max - scale.min)),
    }
}

/// Sums the contributions of `items`. Unanswered items add nothing.
pub fn sum_items(
    items: &[u32],
    sheet: &AnswerSheet,
    reversed: &HashSet<u32>,
    scale: &ScaleConfig,
) -> ItemSum {
    items
        .iter()
        .filter_map(|number| {
            sheet
                .get(*number)
                .map(|score| contribution(score, reversed.contains(number), scale))
        })
        .fold(ItemSum { raw: 0, answered: 0 }, |sum, value| ItemSum {
            raw: sum.raw + value,
            answered: sum.answered + 1,
        })
}

/// Rejects answers to questions the instrument does not have and scores
/// outside the scale.
pub fn check_answers(sheet: &AnswerSheet, instrument: &Instrument) -> Result<()> {
    let known = instrument
        .groups
        .iter()
        .flat_map(|group| group.item_numbers())
        .collect::<HashSet<_>>();
    let scale = &instrument.scale;
    for answer in sheet.answers() {
        if !known.contains(&answer.question_number) {
            return Err(ScoreError::InvalidAnswer(format!(
                "{} has no question {}",
                instrument.instrument.id, answer.question_number
            )));
        }
        if !(scale.min..=scale.max).contains(&answer.score) {
            return Err(ScoreError::InvalidAnswer(format!(
                "question {}: score {} is outside {}..={}",
                answer.question_number, answer.score, scale.min, scale.max
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::answer::Answer;

    fn scale(min: u8, max: u8, contribution: Contribution) -> ScaleConfig {
        ScaleConfig {
            min,
            max,
            contribution,
            reverse: Vec::new(),
        }
    }

    #[test]
    fn reversed_plus_original_is_six_on_five_point_scale() {
        let scale = scale(1, 5, Contribution::Score);
        for score in 1..=5u8 {
            assert_eq!(effective_score(score, true, &scale) + u32::from(score), 6);
            assert_eq!(effective_score(score, false, &scale), u32::from(score));
        }
        assert_eq!(effective_score(1, true, &scale), 5);
        assert_eq!(effective_score(4, true, &scale), 2);
    }

    #[test]
    fn reversal_on_high_valued_scale_does_not_overflow() {
        let scale = scale(100, 200, Contribution::Score);
        assert_eq!(effective_score(150, true, &scale), 150);
        assert_eq!(effective_score(100, true, &scale), 200);
        assert_eq!(contribution(200, true, &scale), 100);

        let above_min = ScaleConfig {
            contribution: Contribution::AboveMin,
            ..scale
        };
        assert_eq!(contribution(120, true, &above_min), 80);
        assert_eq!(contribution_range(&above_min), (0, 100));
    }

    #[test]
    fn above_min_contribution_starts_at_zero() {
        let scale = scale(1, 5, Contribution::AboveMin);
        assert_eq!(contribution(1, false, &scale), 0);
        assert_eq!(contribution(5, false, &scale), 4);
        assert_eq!(contribution(5, true, &scale), 0);
        assert_eq!(contribution_range(&scale), (0, 4));
    }

    #[test]
    fn raw_sum_stays_within_item_bounds() {
        let scale = scale(1, 5, Contribution::Score);
        let items = [1, 2, 3, 4, 5];
        let reversed = HashSet::from([2, 4]);
        for score in 1..=5u8 {
            let sheet: AnswerSheet = items.iter().map(|n| Answer::new(*n, score)).collect();
            let sum = sum_items(&items, &sheet, &reversed, &scale);
            assert!((5..=25).contains(&sum.raw), "raw {} out of bounds", sum.raw);
            assert_eq!(sum.answered, 5);
        }
    }

    #[test]
    fn unanswered_item_contributes_zero() {
        let scale = scale(1, 5, Contribution::Score);
        let sheet: AnswerSheet = [Answer::new(1, 4), Answer::new(3, 2)].into_iter().collect();
        let sum = sum_items(&[1, 2, 3], &sheet, &HashSet::new(), &scale);
        assert_eq!(sum, ItemSum { raw: 6, answered: 2 });
    }

    #[test]
    fn zero_based_scale_sums_without_reversal() {
        let scale = scale(0, 4, Contribution::Score);
        let sheet: AnswerSheet = [Answer::new(1, 0), Answer::new(2, 4)].into_iter().collect();
        let sum = sum_items(&[1, 2], &sheet, &HashSet::new(), &scale);
        assert_eq!(sum.raw, 4);
        assert_eq!(contribution_range(&scale), (0, 4));
    }
}
