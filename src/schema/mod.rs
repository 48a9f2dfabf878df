//! Types used throughout.
//!
//! > Schema defines the plain old data types that views operate on. Notably, the schema module has
//! > no knowledge of the database, nor any dependencies on any of the rest of the system.
//!
//! (The diesel derives are the one concession; they only say which SQL type a value comes from.)

use chrono::NaiveDateTime;
use diesel::{deserialize::FromSqlRow, expression::AsExpression, sql_types::Text, Queryable};
use serde_derive::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Coordinates are kept as fixed-point integers with six fractional digits.
const MICRODEGREES: f64 = 1_000_000.0;

/// Converts degrees to integer microdegrees, rounding to the sixth fractional digit.
pub fn to_microdegrees(degrees: f64) -> i64 {
    (degrees * MICRODEGREES).round() as i64
}

/// Converts integer microdegrees back to degrees.
pub fn from_microdegrees(micro: i64) -> f64 {
    micro as f64 / MICRODEGREES
}

/// A user. Identity is owned by whoever issues session tokens; we only keep a display name.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct User {
    /// The user's database ID.
    pub id: i64,

    /// The user's name.
    pub name: String,
}

/// A travel group.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct TravelGroup {
    /// The group's database ID.
    pub id: i64,

    /// The group's name.
    pub name: String,

    /// A free-form description.
    pub description: String,

    /// The user who created the group, if they still exist.
    pub created_by: Option<i64>,

    /// When the group was created.
    pub created_at: NaiveDateTime,

    /// When the group was last changed.
    pub updated_at: NaiveDateTime,
}

/// A user's membership in a group.
#[derive(Clone, Debug, PartialEq, Queryable, Serialize)]
pub struct Membership {
    /// The membership's database ID.
    pub id: i64,

    /// The group.
    pub group_id: i64,

    /// The member.
    pub user_id: i64,

    /// Whether the member administers the group.
    pub is_admin: bool,

    /// When the user joined.
    pub joined_at: NaiveDateTime,
}

/// A member of a group, as shown on the group page.
#[derive(Clone, Debug, Queryable, Serialize)]
pub struct Member {
    /// The member's user ID.
    pub user_id: i64,

    /// The member's name.
    pub name: String,

    /// Whether the member administers the group.
    pub is_admin: bool,

    /// When the member joined.
    pub joined_at: NaiveDateTime,
}

/// A group the user belongs to, for the group list.
#[derive(Clone, Debug, Serialize)]
pub struct GroupSummary {
    /// The group.
    pub group: TravelGroup,

    /// How many members the group has.
    pub member_count: i64,

    /// Whether the viewing user administers the group.
    pub is_admin: bool,
}

/// Everything shown on a group's page.
#[derive(Clone, Debug, Serialize)]
pub struct GroupDetail {
    /// The group.
    pub group: TravelGroup,

    /// The viewing user's membership.
    pub me: Membership,

    /// Every member, in join order.
    pub members: Vec<Member>,

    /// Every place saved to the group, in the order they were saved.
    pub places: Vec<PlaceEntry>,
}

/// A point of interest. Places are shared between groups; what a group says about a place lives
/// in its `GroupPlace`.
#[derive(Clone, Debug, PartialEq, Queryable, Serialize)]
pub struct Place {
    /// The place's database ID.
    pub id: i64,

    /// The ID the search provider knows this place by.
    pub external_id: Option<String>,

    /// The place's name.
    pub name: String,

    /// The place's address.
    pub address: String,

    /// Latitude, in microdegrees.
    pub lat_e6: i64,

    /// Longitude, in microdegrees.
    pub lng_e6: i64,

    /// A phone number, or the empty string.
    pub phone: String,

    /// A URL, or the empty string.
    pub url: String,

    /// When the place was first saved.
    pub created_at: NaiveDateTime,
}

impl Place {
    /// The latitude in degrees.
    pub fn lat(&self) -> f64 {
        from_microdegrees(self.lat_e6)
    }

    /// The longitude in degrees.
    pub fn lng(&self) -> f64 {
        from_microdegrees(self.lng_e6)
    }
}

/// What kind of place a group considers something to be.
#[derive(
    AsExpression, Clone, Copy, Debug, Deserialize, Eq, FromSqlRow, Hash, PartialEq, Serialize,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaceType {
    /// Somewhere to eat.
    Restaurant,
    /// Coffee and such.
    Cafe,
    /// Something to see.
    Attraction,
    /// Somewhere to shop.
    Shopping,
    /// A park.
    Park,
    /// A museum or exhibition.
    Museum,
    /// Somewhere to sleep.
    Accommodation,
    /// Anything else.
    Other,
}

impl PlaceType {
    /// Every place type, in the order they're offered in forms.
    pub const ALL: [PlaceType; 8] = [
        PlaceType::Restaurant,
        PlaceType::Cafe,
        PlaceType::Attraction,
        PlaceType::Shopping,
        PlaceType::Park,
        PlaceType::Museum,
        PlaceType::Accommodation,
        PlaceType::Other,
    ];

    /// The stored (and serialized) name of the place type.
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceType::Restaurant => "RESTAURANT",
            PlaceType::Cafe => "CAFE",
            PlaceType::Attraction => "ATTRACTION",
            PlaceType::Shopping => "SHOPPING",
            PlaceType::Park => "PARK",
            PlaceType::Museum => "MUSEUM",
            PlaceType::Accommodation => "ACCOMMODATION",
            PlaceType::Other => "OTHER",
        }
    }

    /// A human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            PlaceType::Restaurant => "Restaurant",
            PlaceType::Cafe => "Cafe",
            PlaceType::Attraction => "Attraction",
            PlaceType::Shopping => "Shopping",
            PlaceType::Park => "Park",
            PlaceType::Museum => "Museum / Exhibition",
            PlaceType::Accommodation => "Accommodation",
            PlaceType::Other => "Other",
        }
    }
}

impl Default for PlaceType {
    fn default() -> PlaceType {
        PlaceType::Other
    }
}

impl fmt::Display for PlaceType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for PlaceType {
    type Err = String;

    fn from_str(s: &str) -> Result<PlaceType, String> {
        PlaceType::ALL
            .iter()
            .cloned()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown place type: {:?}", s))
    }
}

/// A group's annotation of a shared place.
#[derive(Clone, Debug, PartialEq, Queryable, Serialize)]
pub struct GroupPlace {
    /// The link's database ID.
    pub id: i64,

    /// The group the place was saved to.
    pub group_id: i64,

    /// The place.
    pub place_id: i64,

    /// The user who saved the place, if they still exist.
    pub created_by: Option<i64>,

    /// What kind of place the group considers it.
    pub place_type: PlaceType,

    /// What the group calls the place. Empty means "use the place's name".
    pub nickname: String,

    /// The group's notes about the place.
    pub description: String,

    /// When the place was saved to the group.
    pub created_at: NaiveDateTime,

    /// When the group's notes were last changed.
    pub updated_at: NaiveDateTime,
}

/// The group-scoped fields of a `GroupPlace`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LinkFields {
    /// What kind of place the group considers it.
    pub place_type: PlaceType,

    /// What the group calls the place.
    pub nickname: String,

    /// The group's notes about the place.
    pub description: String,
}

/// A place as it appears in a group, with its vote tally.
#[derive(Clone, Debug, Serialize)]
pub struct PlaceEntry {
    /// The group's annotation.
    pub link: GroupPlace,

    /// The shared place.
    pub place: Place,

    /// How many members recommend the place.
    pub recommendations: i64,

    /// Whether the viewing user recommends the place.
    pub recommended: bool,
}

impl PlaceEntry {
    /// The name the group uses for the place.
    pub fn display_name(&self) -> &str {
        if self.link.nickname.is_empty() {
            &self.place.name
        } else {
            &self.link.nickname
        }
    }
}

/// A place that could be saved: either one already in the database (`id` is set) or a search
/// result that hasn't been persisted yet.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PlaceCandidate {
    /// The place's database ID, if it has already been saved.
    pub id: Option<i64>,

    /// The ID the search provider knows this place by.
    pub external_id: Option<String>,

    /// The place's name.
    pub name: String,

    /// The place's address.
    pub address: String,

    /// Latitude, in degrees.
    pub lat: Option<f64>,

    /// Longitude, in degrees.
    pub lng: Option<f64>,

    /// A phone number.
    pub phone: Option<String>,

    /// A URL.
    pub url: Option<String>,
}

impl From<Place> for PlaceCandidate {
    fn from(place: Place) -> PlaceCandidate {
        PlaceCandidate {
            id: Some(place.id),
            lat: Some(place.lat()),
            lng: Some(place.lng()),
            external_id: place.external_id,
            name: place.name,
            address: place.address,
            phone: Some(place.phone).filter(|s| !s.is_empty()),
            url: Some(place.url).filter(|s| !s.is_empty()),
        }
    }
}

/// A validated place, ready to be inserted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPlace {
    /// The ID the search provider knows this place by.
    pub external_id: Option<String>,

    /// The place's name.
    pub name: String,

    /// The place's address.
    pub address: String,

    /// Latitude, in microdegrees.
    pub lat_e6: i64,

    /// Longitude, in microdegrees.
    pub lng_e6: i64,

    /// A phone number, or the empty string.
    pub phone: String,

    /// A URL, or the empty string.
    pub url: String,
}

/// Which field of a place a search matches against.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBy {
    /// Match against the place's name.
    Name,

    /// Match against the place's address.
    Address,
}

impl Default for SearchBy {
    fn default() -> SearchBy {
        SearchBy::Name
    }
}

/// Whether a user recommends a place.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendState {
    /// The user's vote is present.
    Recommended,

    /// The user's vote is absent.
    Unrecommended,
}

/// The result of flipping a recommendation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ToggleOutcome {
    /// The user's vote after the toggle.
    pub state: RecommendState,

    /// How many members recommend the place after the toggle.
    pub count: i64,
}
