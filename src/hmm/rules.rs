use super::{data::Float, model::TaggerData};

/// Rows already this close to one are left untouched so reapplying the
/// rules is a no-op.
const NORMALIZED_EPS: Float = 1e-12;

/// Zeroes every transition a forbid or enforce rule rules out, then
/// renormalizes each `A[i][j]` row; rows left without mass become all zero.
pub fn apply_rules(td: &mut TaggerData) {
    let n = td.n();
    let forbid_rules = td.forbid_rules().to_vec();
    for rule in &forbid_rules {
        match rule.tagk {
            Some(tagk) => td.set_a(rule.tagi, rule.tagj, tagk, 0.0),
            None => {
                for k in 0..n {
                    td.set_a(rule.tagi, rule.tagj, k, 0.0);
                    td.set_a(k, rule.tagi, rule.tagj, 0.0);
                }
            }
        }
    }

    let enforce_rules = td.enforce_rules().to_vec();
    for rule in &enforce_rules {
        for j in 0..n {
            if !rule.tagsj.contains(&j) {
                for k in 0..n {
                    td.set_a(k, rule.tagi, j, 0.0);
                    td.set_a(rule.tagi, j, k, 0.0);
                }
            } else if !rule.tagsk.is_empty() {
                for k in (0..n).filter(|k| !rule.tagsk.contains(k)) {
                    td.set_a(rule.tagi, j, k, 0.0);
                }
            }
        }
    }

    for i in 0..n {
        for j in 0..n {
            let row = td.a_row_mut(i, j);
            let sum: Float = row.iter().sum();
            if sum > 0.0 {
                if (sum - 1.0).abs() > NORMALIZED_EPS {
                    row.iter_mut().for_each(|p| *p /= sum);
                }
            } else {
                row.iter_mut().for_each(|p| *p = 0.0);
            }
        }
    }
    log::debug!("applied {} forbid and {} enforce rules", forbid_rules.len(), enforce_rules.len());
}
