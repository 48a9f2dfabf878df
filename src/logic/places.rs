//! Saving places to groups, and finding places to save.

use crate::{
    dal::{PlaceRef, PlaceSearch, DB},
    error::{FieldErrors, Result},
    logic::access::{authorize, Action},
    schema::{
        to_microdegrees, GroupPlace, LinkFields, NewPlace, Place, PlaceCandidate, PlaceEntry,
        PlaceType, SearchBy,
    },
};
use log::{info, warn};

/// The longest a place's name may be, in characters.
pub const MAX_PLACE_NAME_LEN: usize = 200;

/// The longest a place's address may be, in characters.
pub const MAX_ADDRESS_LEN: usize = 255;

/// The longest a phone number may be, in characters.
pub const MAX_PHONE_LEN: usize = 15;

/// The longest a group's nickname for a place may be, in characters.
pub const MAX_NICKNAME_LEN: usize = 100;

/// How many saved places a search returns at most.
pub const SEARCH_LIMIT: i64 = 15;

/// Checks a candidate over, turning it into a reference to a place to find or create.
///
/// A candidate that names a saved place is taken as-is; anything else must carry a name, an
/// address and coordinates.
pub fn validate_candidate(candidate: &PlaceCandidate) -> Result<PlaceRef> {
    if let Some(id) = candidate.id {
        return Ok(PlaceRef::Existing(id));
    }

    let mut errors = FieldErrors::default();
    let name = candidate.name.trim();
    let address = candidate.address.trim();
    let phone = candidate.phone.as_ref().map(|s| s.trim()).unwrap_or("");
    let url = candidate.url.as_ref().map(|s| s.trim()).unwrap_or("");

    check_len(&mut errors, "name", name, MAX_PLACE_NAME_LEN, true);
    check_len(&mut errors, "address", address, MAX_ADDRESS_LEN, true);
    check_len(&mut errors, "phone", phone, MAX_PHONE_LEN, false);
    let lat = check_coordinate(&mut errors, "lat", candidate.lat, 90.0);
    let lng = check_coordinate(&mut errors, "lng", candidate.lng, 180.0);
    if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.add("url", "URLs must start with http:// or https://.");
    }
    errors.into_result()?;

    Ok(PlaceRef::New(NewPlace {
        external_id: candidate
            .external_id
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        name: name.to_string(),
        address: address.to_string(),
        lat_e6: to_microdegrees(lat),
        lng_e6: to_microdegrees(lng),
        phone: phone.to_string(),
        url: url.to_string(),
    }))
}

/// Checks over the group-scoped fields of a link. A blank place type means `OTHER`.
pub fn parse_link_fields(
    place_type: &str,
    nickname: &str,
    description: &str,
) -> Result<LinkFields> {
    let mut errors = FieldErrors::default();
    let place_type = match place_type.trim() {
        "" => PlaceType::Other,
        s => s.parse().unwrap_or_else(|err: String| {
            errors.add("place_type", err);
            PlaceType::Other
        }),
    };
    let nickname = nickname.trim();
    check_len(&mut errors, "nickname", nickname, MAX_NICKNAME_LEN, false);
    errors.into_result()?;

    Ok(LinkFields {
        place_type,
        nickname: nickname.to_string(),
        description: description.trim().to_string(),
    })
}

/// Finds the place the candidate describes, creating it if it isn't saved yet.
pub async fn resolve_or_create_place(db: &DB, candidate: &PlaceCandidate) -> Result<Place> {
    let place = validate_candidate(candidate)?;
    db.resolve_or_create_place(place).await
}

/// Saves an already-known place to a group.
pub async fn link_place_to_group(
    db: &DB,
    user: i64,
    group: i64,
    place: i64,
    fields: LinkFields,
) -> Result<GroupPlace> {
    let _ = authorize(db, user, group, Action::Contribute).await?;
    db.link_place(group, place, user, fields).await
}

/// Saves a candidate to a group, creating the place first if needed. Saving a place the group
/// already has is a conflict.
pub async fn save_place(
    db: &DB,
    user: i64,
    group: i64,
    candidate: &PlaceCandidate,
    fields: LinkFields,
) -> Result<(GroupPlace, Place)> {
    let _ = authorize(db, user, group, Action::Contribute).await?;
    let place = validate_candidate(candidate)?;
    let (link, place) = db.save_place_to_group(group, place, user, fields).await?;
    info!(
        "User {} saved place {} ({:?}) to group {}",
        user, place.id, place.name, group
    );
    Ok((link, place))
}

/// Gets a link for editing. Only its creator and the group's admins may edit it; to anyone outside
/// the group, it doesn't exist.
pub async fn get_link_for_edit(db: &DB, user: i64, link: i64) -> Result<(GroupPlace, Place)> {
    let (link, place) = db.get_link(link).await?;
    let _ = authorize(db, user, link.group_id, Action::View).await?;
    authorize_modify(db, user, link, place).await
}

async fn modifiable_link(db: &DB, user: i64, link: i64) -> Result<(GroupPlace, Place)> {
    let (link, place) = db.get_link(link).await?;
    authorize_modify(db, user, link, place).await
}

async fn authorize_modify(
    db: &DB,
    user: i64,
    link: GroupPlace,
    place: Place,
) -> Result<(GroupPlace, Place)> {
    let _ = authorize(
        db,
        user,
        link.group_id,
        Action::Modify {
            created_by: link.created_by,
        },
    )
    .await?;
    Ok((link, place))
}

/// Changes what a group says about a place. The place itself is left alone.
pub async fn update_link(
    db: &DB,
    user: i64,
    link: i64,
    fields: LinkFields,
) -> Result<GroupPlace> {
    let (link, _) = modifiable_link(db, user, link).await?;
    db.update_link(link.id, fields).await
}

/// Removes a place from a group, returning the group's ID.
pub async fn delete_link(db: &DB, user: i64, link: i64) -> Result<i64> {
    let (link, place) = modifiable_link(db, user, link).await?;
    db.delete_link(link.id).await?;
    info!(
        "User {} removed place {} ({:?}) from group {}",
        user, place.id, place.name, link.group_id
    );
    Ok(link.group_id)
}

/// Lists a group's places in the order they were saved.
pub async fn list_group_places(db: &DB, user: i64, group: i64) -> Result<Vec<PlaceEntry>> {
    let _ = authorize(db, user, group, Action::View).await?;
    db.list_group_places(group, user).await
}

/// Searches for places to save to a group. Saved places are preferred; only when none match is
/// the search provider asked. If the provider can't be reached, nothing is found.
pub async fn search(
    db: &DB,
    provider: &PlaceSearch,
    user: i64,
    group: i64,
    query: &str,
    by: SearchBy,
) -> Result<Vec<PlaceCandidate>> {
    let _ = authorize(db, user, group, Action::View).await?;
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let saved = db
        .search_places(query.to_string(), by, SEARCH_LIMIT)
        .await?;
    if !saved.is_empty() {
        return Ok(saved.into_iter().map(PlaceCandidate::from).collect());
    }

    match provider.search(query, by).await {
        Ok(found) => Ok(found),
        Err(err) => {
            warn!("Place search for {:?} failed: {}", query, err);
            Ok(Vec::new())
        }
    }
}

fn check_len(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    max: usize,
    required: bool,
) {
    if value.is_empty() {
        if required {
            errors.add(field, "This field is required.");
        }
    } else if value.chars().count() > max {
        errors.add(field, format!("This can be at most {} characters.", max));
    }
}

fn check_coordinate(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<f64>,
    limit: f64,
) -> f64 {
    match value {
        None => {
            errors.add(field, "This field is required.");
            0.0
        }
        Some(x) if !x.is_finite() || x < -limit || x > limit => {
            errors.add(field, format!("This must be between -{} and {}.", limit, limit));
            0.0
        }
        Some(x) => x,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_link_fields, validate_candidate};
    use crate::{
        dal::PlaceRef,
        error::Error,
        schema::{PlaceCandidate, PlaceType},
    };

    fn gyeongbokgung() -> PlaceCandidate {
        PlaceCandidate {
            external_id: Some("8217054".to_string()),
            name: " Gyeongbokgung ".to_string(),
            address: "161 Sajik-ro, Jongno-gu, Seoul".to_string(),
            lat: Some(37.579),
            lng: Some(126.977),
            ..PlaceCandidate::default()
        }
    }

    #[test]
    fn complete_candidates_are_accepted() {
        match validate_candidate(&gyeongbokgung()).unwrap() {
            PlaceRef::New(place) => {
                assert_eq!(place.name, "Gyeongbokgung");
                assert_eq!(place.lat_e6, 37_579_000);
                assert_eq!(place.lng_e6, 126_977_000);
                assert_eq!(place.phone, "");
                assert_eq!(place.external_id.as_ref().map(|s| &s[..]), Some("8217054"));
            }
            other => panic!("expected a new place, got {:?}", other),
        }
    }

    #[test]
    fn saved_places_skip_validation() {
        let candidate = PlaceCandidate {
            id: Some(12),
            ..PlaceCandidate::default()
        };
        assert_eq!(validate_candidate(&candidate).unwrap(), PlaceRef::Existing(12));
    }

    #[test]
    fn every_missing_field_is_reported() {
        let candidate = PlaceCandidate {
            lat: Some(91.0),
            ..PlaceCandidate::default()
        };
        match validate_candidate(&candidate) {
            Err(Error::Validation(errors)) => {
                assert!(errors.has("name"));
                assert!(errors.has("address"));
                assert!(errors.has("lat"));
                assert!(errors.has("lng"));
                assert!(!errors.has("url"));
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn urls_must_be_web_urls() {
        let candidate = PlaceCandidate {
            url: Some("javascript:alert(1)".to_string()),
            ..gyeongbokgung()
        };
        match validate_candidate(&candidate) {
            Err(Error::Validation(errors)) => assert!(errors.has("url")),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn link_fields_default_to_other() {
        let fields = parse_link_fields("", " Palace ", "go early").unwrap();
        assert_eq!(fields.place_type, PlaceType::Other);
        assert_eq!(fields.nickname, "Palace");

        let fields = parse_link_fields("attraction", "", "").unwrap();
        assert_eq!(fields.place_type, PlaceType::Attraction);

        match parse_link_fields("CASINO", "", "") {
            Err(Error::Validation(errors)) => assert!(errors.has("place_type")),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }
}
