use std::collections::{BTreeMap, HashMap};

/// Approaches of a four-way junction, in priority order for ties.
pub const LANES: [&str; 4] = ["L1", "L2", "L3", "L4"];

/// Green (`true`) or red (`false`) for every lane in [`LANES`].
pub type SignalState = BTreeMap<&'static str, bool>;

/// Gives green to the most congested lane and red to the rest.
///
/// Lanes missing from `scores`, unknown lane names and NaN scores are not
/// candidates. Equal scores resolve to the earlier lane. With no candidate
/// at all every lane stays red.
pub fn signal_decision(scores: &HashMap<String, f64>) -> SignalState {
    let mut state: SignalState = LANES.iter().map(|&lane| (lane, false)).collect();

    let mut busiest: Option<(&'static str, f64)> = None;
    for lane in LANES {
        let Some(&score) = scores.get(lane) else {
            continue;
        };
        if score.is_nan() {
            continue;
        }
        if busiest.map_or(true, |(_, best)| score > best) {
            busiest = Some((lane, score));
        }
    }

    if let Some((lane, _)) = busiest {
        state.insert(lane, true);
    }
    state
}

/// Lane fed by a junction id: junction 1 is `L1` and so on.
pub fn lane_for_junction(junction: u32) -> Option<&'static str> {
    let index = usize::try_from(junction).ok()?.checked_sub(1)?;
    LANES.get(index).copied()
}
