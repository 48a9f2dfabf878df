//! The "top places" view.

use crate::{
    dal::DB,
    error::Result,
    logic::access::{authorize, Action},
    schema::PlaceEntry,
};

/// How many places `top_places` returns when not told otherwise.
pub const DEFAULT_TOP_N: usize = 10;

/// The most places `top_places` will return.
pub const MAX_TOP_N: usize = 50;

/// Gets a group's most-recommended places, most recommended first. Ties go to the place saved
/// most recently.
pub async fn top_places(
    db: &DB,
    user: i64,
    group: i64,
    n: Option<usize>,
) -> Result<Vec<PlaceEntry>> {
    let _ = authorize(db, user, group, Action::View).await?;
    let n = n.unwrap_or(DEFAULT_TOP_N).min(MAX_TOP_N);
    let entries = db.list_group_places(group, user).await?;
    Ok(rank(entries, n))
}

/// Orders places by recommendation count (descending), then by when they were saved (newest
/// first), keeping the first `n`.
pub fn rank(mut entries: Vec<PlaceEntry>, n: usize) -> Vec<PlaceEntry> {
    entries.sort_by(|a, b| {
        b.recommendations
            .cmp(&a.recommendations)
            .then_with(|| b.link.created_at.cmp(&a.link.created_at))
            .then_with(|| b.link.id.cmp(&a.link.id))
    });
    entries.truncate(n);
    entries
}

#[cfg(test)]
mod tests {
    use super::rank;
    use crate::schema::{GroupPlace, Place, PlaceEntry, PlaceType};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .and_then(|d| d.and_hms_opt(9, minute, 0))
            .unwrap()
    }

    fn entry(id: i64, recommendations: i64, saved_at: u32) -> PlaceEntry {
        PlaceEntry {
            link: GroupPlace {
                id,
                group_id: 1,
                place_id: id,
                created_by: Some(1),
                place_type: PlaceType::Other,
                nickname: String::new(),
                description: String::new(),
                created_at: at(saved_at),
                updated_at: at(saved_at),
            },
            place: Place {
                id,
                external_id: None,
                name: format!("Place {}", id),
                address: "Seoul".to_string(),
                lat_e6: 37_566_500,
                lng_e6: 126_978_000,
                phone: String::new(),
                url: String::new(),
                created_at: at(saved_at),
            },
            recommendations,
            recommended: false,
        }
    }

    fn ids(entries: &[PlaceEntry]) -> Vec<i64> {
        entries.iter().map(|e| e.link.id).collect()
    }

    #[test]
    fn most_recommended_first() {
        let ranked = rank(vec![entry(1, 0, 0), entry(2, 3, 1), entry(3, 1, 2)], 10);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn ties_go_to_the_newest() {
        let ranked = rank(vec![entry(1, 2, 5), entry(2, 2, 9), entry(3, 2, 7)], 10);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);

        let ranked = rank(vec![entry(4, 1, 5), entry(5, 1, 5)], 10);
        assert_eq!(ids(&ranked), vec![5, 4]);
    }

    #[test]
    fn at_most_n() {
        let entries = (1..=20).map(|i| entry(i, i % 4, 0)).collect();
        let ranked = rank(entries, 5);
        assert_eq!(ranked.len(), 5);
        assert!(ranked.windows(2).all(|w| w[0].recommendations >= w[1].recommendations));

        assert!(rank(vec![entry(1, 2, 0)], 0).is_empty());
    }
}
