//! Deterministic tie-break over distributive candidates.

use chrono::NaiveDate;

/// Support type value marking an active distributive.
pub const ACTIVE_SUPPORT_TYPE: &str = "+";

/// A distributive row sharing the looked-up number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: i64,
    pub support_type: Option<String>,
    pub connected_on: Option<NaiveDate>,
    pub installed_on: Option<NaiveDate>,
}

impl Candidate {
    /// Whether the row carries the active marker.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.support_type.as_deref() == Some(ACTIVE_SUPPORT_TYPE)
    }

    /// Connection date, falling back to the installation date.
    #[must_use]
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.connected_on.or(self.installed_on)
    }
}

/// Pick the entity id for a set of candidates.
///
/// Any active row wins outright. Otherwise the row with the latest effective
/// date is chosen; rows without a date lose to any dated row. Returns `None`
/// for an empty candidate set.
#[must_use]
pub fn pick_entity(candidates: &[Candidate]) -> Option<i64> {
    if let Some(active) = candidates.iter().find(|c| c.is_active()) {
        return Some(active.id);
    }

    candidates
        .iter()
        .fold(None::<&Candidate>, |best, c| match best {
            Some(b) if b.effective_date() >= c.effective_date() => Some(b),
            _ => Some(c),
        })
        .map(|c| c.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, active: bool, date: Option<&str>) -> Candidate {
        Candidate {
            id,
            support_type: Some(if active { "+" } else { "-" }.to_string()),
            connected_on: date.map(|d| d.parse().unwrap()),
            installed_on: None,
        }
    }

    #[test]
    fn test_active_row_wins_regardless_of_dates() {
        let candidates = [
            candidate(1, false, Some("2020-01-01")),
            candidate(2, true, Some("2019-01-01")),
            candidate(3, false, Some("2021-01-01")),
        ];
        assert_eq!(pick_entity(&candidates), Some(2));
    }

    #[test]
    fn test_latest_effective_date_wins_without_active() {
        let candidates = [
            candidate(1, false, Some("2020-01-01")),
            candidate(2, false, Some("2021-01-01")),
        ];
        assert_eq!(pick_entity(&candidates), Some(2));
    }

    #[test]
    fn test_installation_date_is_fallback() {
        let mut installed_late = candidate(7, false, None);
        installed_late.installed_on = Some("2022-05-01".parse().unwrap());
        let candidates = [candidate(6, false, Some("2021-01-01")), installed_late];
        assert_eq!(pick_entity(&candidates), Some(7));
    }

    #[test]
    fn test_undated_rows_lose_to_dated() {
        let candidates = [candidate(1, false, None), candidate(2, false, Some("2001-01-01"))];
        assert_eq!(pick_entity(&candidates), Some(2));
    }

    #[test]
    fn test_no_candidates_is_unresolved() {
        assert_eq!(pick_entity(&[]), None);
    }

    #[test]
    fn test_missing_support_type_is_not_active() {
        let c = Candidate {
            id: 1,
            support_type: None,
            connected_on: None,
            installed_on: None,
        };
        assert!(!c.is_active());
        assert_eq!(pick_entity(&[c]), Some(1));
    }
}
