use crate::types::instrument::LevelBand;

/// Picks the band `value` falls into. Bands are ordered by ascending lower
/// bound; a value sitting exactly on an inclusive bound belongs to the higher
/// band. Returns `None` only for an empty table.
pub fn classify(value: f64, bands: &[LevelBand]) -> Option<&LevelBand> {
    let (first, rest) = bands.split_first()?;
    let mut current = first;
    for band in rest {
        let Some(from) = band.from else {
            continue;
        };
        let reached = if band.exclusive {
            value > from
        } else {
            value >= from
        };
        if !reached {
            break;
        }
        current = band;
    }
    Some(current)
}
