use crate::engine::level::classify;
use crate::engine::standardize::dichotomy_split;
use crate::types::instrument::{CompositeRule, DichotomyConfig, LevelBand};
use crate::types::result::{CategorySummary, Composite, DichotomyScore, GroupScore};

/// Indices of `groups` ordered by raw score descending, then id ascending.
pub fn rank_order(groups: &[GroupScore]) -> Vec<usize> {
    let mut order = (0..groups.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| {
        groups[b]
            .raw_score
            .cmp(&groups[a].raw_score)
            .then_with(|| groups[a].id.cmp(&groups[b].id))
    });
    order
}

/// Writes positional ranks (1-based) and returns the rank order.
pub fn assign_ranks(groups: &mut [GroupScore]) -> Vec<usize> {
    let order = rank_order(groups);
    for (position, &index) in order.iter().enumerate() {
        groups[index].rank = position + 1;
    }
    order
}

pub fn derive(
    rule: &CompositeRule,
    groups: &mut [GroupScore],
    order: &[usize],
) -> Option<Composite> {
    match rule {
        CompositeRule::Plain => None,
        CompositeRule::Code { length } => {
            let members = mark_top(groups, &order[..*length]);
            Some(Composite::Code {
                code: members.concat(),
                members,
            })
        }
        CompositeRule::Wing => {
            let primary = order[0];
            let wing = wing_of(groups, primary);
            mark_top(groups, &order[..1]);
            let primary = &groups[primary];
            Some(Composite::Wing {
                primary: primary.id.clone(),
                wing: groups[wing].id.clone(),
                code: format!("{}w{}", primary.id, groups[wing].id),
                category: primary.category.clone(),
            })
        }
        CompositeRule::Signature { count } => Some(Composite::Signature {
            strengths: mark_top(groups, &order[..*count]),
        }),
        CompositeRule::TopTalents {
            base,
            extended,
            window,
        } => {
            let count = top_talent_count(groups, order, *base, *extended, *window);
            Some(Composite::TopTalents {
                talents: mark_top(groups, &order[..count]),
            })
        }
        CompositeRule::Dichotomies { pairs, clarity } => {
            let scored: &[GroupScore] = groups;
            let dichotomies = pairs
                .iter()
                .filter_map(|pair| dichotomy(scored, pair, clarity))
                .collect::<Vec<_>>();
            for score in &dichotomies {
                if let Some(group) = groups.iter_mut().find(|group| group.id == score.preference) {
                    group.is_top = true;
                }
            }
            Some(Composite::Dichotomies {
                type_code: dichotomies
                    .iter()
                    .map(|score| score.preference.as_str())
                    .collect(),
                dichotomies,
            })
        }
    }
}

fn mark_top(groups: &mut [GroupScore], indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .map(|&index| {
            groups[index].is_top = true;
            groups[index].id.clone()
        })
        .collect()
}

/// The higher-scoring of the two circular neighbours of `primary` in
/// definition order. A tie goes to the preceding neighbour.
pub fn wing_of(groups: &[GroupScore], primary: usize) -> usize {
    let len = groups.len();
    let previous = (primary + len - 1) % len;
    let next = (primary + 1) % len;
    if groups[previous].raw_score >= groups[next].raw_score {
        previous
    } else {
        next
    }
}

/// `base` talents, widened to `extended` when the `extended`-th score is
/// within `window` raw points of the leader.
pub fn top_talent_count(
    groups: &[GroupScore],
    order: &[usize],
    base: usize,
    extended: usize,
    window: u32,
) -> usize {
    if order.len() < extended || extended == 0 {
        return base.min(order.len());
    }
    let leader = groups[order[0]].raw_score;
    let candidate = groups[order[extended - 1]].raw_score;
    if candidate + window >= leader {
        extended
    } else {
        base
    }
}

fn dichotomy(
    groups: &[GroupScore],
    pair: &DichotomyConfig,
    clarity: &[LevelBand],
) -> Option<DichotomyScore> {
    let first = groups.iter().find(|group| group.id == pair.first)?;
    let second = groups.iter().find(|group| group.id == pair.second)?;
    let (first_pole_score, second_pole_score) =
        dichotomy_split(first.raw_score, second.raw_score);
    let preference = if first_pole_score >= 50 {
        &first.id
    } else {
        &second.id
    };
    let band = classify(
        f64::from(first_pole_score.max(second_pole_score)),
        clarity,
    );
    Some(DichotomyScore {
        dichotomy: format!("{}{}", first.id, second.id),
        name: pair.name.clone(),
        name_en: pair.name_en.clone(),
        first_pole: first.id.clone(),
        second_pole: second.id.clone(),
        first_pole_score,
        second_pole_score,
        preference: preference.clone(),
        clarity: band.map(|band| band.level.clone()).unwrap_or_default(),
        clarity_label: band.and_then(|band| band.label.clone()),
    })
}

/// Mean percentage per category, in order of first appearance.
pub fn categories(groups: &[GroupScore]) -> Vec<CategorySummary> {
    let mut summaries: Vec<(CategorySummary, i32)> = Vec::new();
    for group in groups {
        let Some(category) = &group.category else {
            continue;
        };
        match summaries
            .iter_mut()
            .find(|(summary, _)| &summary.category == category)
        {
            Some((summary, total)) => {
                summary.groups.push(group.id.clone());
                *total += group.percentage;
            }
            None => summaries.push((
                CategorySummary {
                    category: category.clone(),
                    groups: vec![group.id.clone()],
                    mean_percentage: 0.0,
                },
                group.percentage,
            )),
        }
    }
    summaries
        .into_iter()
        .map(|(mut summary, total)| {
            let mean = f64::from(total) / summary.groups.len() as f64;
            summary.mean_percentage = (mean * 10.0).round() / 10.0;
            summary
        })
        .collect()
}
