//! Bindings to the database.
//!
//! > **DAL**, for lack of a better term (borrowing this one from "data access layer" since I don't
//! > want to use "model"), is the only module that does any talking to the database, or any other
//! > IO or interaction with other kinds of externalized state for that matter.

#[allow(unused_import_braces)]
mod schema;
mod search;
mod types;

pub use crate::dal::search::PlaceSearch;
use crate::{
    dal::schema::{
        auths, group_places, memberships, places, recommendations, travel_groups, users,
    },
    error::{Error, Result},
    schema::{
        GroupPlace, GroupSummary, LinkFields, Member, Membership, NewPlace, Place, PlaceEntry,
        RecommendState, SearchBy, ToggleOutcome, TravelGroup, User,
    },
};
use chrono::{NaiveDateTime, Utc};
use diesel::{
    connection::SimpleConnection,
    delete,
    dsl::count_star,
    insert_into,
    prelude::*,
    r2d2::{ConnectionManager, CustomizeConnection, Pool},
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use failure::{format_err, Fallible};
use log::debug;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// A reference to a place to save: either one that is known to exist, or one to find or create.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaceRef {
    /// A place already in the database.
    Existing(i64),

    /// A place described by a search result; it may or may not be in the database yet.
    New(NewPlace),
}

/// A pool of connections to the database.
#[derive(Clone, Debug)]
pub struct DB {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl DB {
    /// Connects to the database with at the given URL, running any pending migrations.
    ///
    /// `:memory:` gets a pool of a single connection that is never recycled, since every SQLite
    /// connection to `:memory:` is a distinct database.
    pub fn connect(database_url: &str) -> Fallible<DB> {
        let builder = Pool::builder().connection_customizer(Box::new(ConnectionOptions));
        let builder = if database_url == ":memory:" {
            builder.max_size(1).idle_timeout(None).max_lifetime(None)
        } else {
            builder.max_size(8)
        };
        let pool = builder.build(ConnectionManager::new(database_url))?;

        let mut conn = pool.get()?;
        let conn: &mut SqliteConnection = &mut conn;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| format_err!("Couldn't run migrations: {}", err))?;
        debug!("Applied {} migration(s)", applied.len());

        Ok(DB {
            pool: Arc::new(pool),
        })
    }

    /// Creates an authentication token for the given user, returning it.
    pub async fn create_auth(&self, user: i64, expires: Option<NaiveDateTime>) -> Result<Uuid> {
        self.async_query(move |conn| {
            let token = Uuid::new_v4();
            let _ = insert_into(auths::table)
                .values((
                    auths::id.eq(token.to_string()),
                    auths::userid.eq(user),
                    auths::expires.eq(expires),
                ))
                .execute(conn)?;
            Ok(token)
        })
        .await
    }

    /// Creates a user, returning them.
    pub async fn create_user(&self, name: String) -> Result<User> {
        self.async_query(move |conn| {
            insert_into(users::table)
                .values(users::name.eq(&name))
                .get_result(conn)
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        Error::Conflict(format!("The name {:?} is already taken.", name))
                    } else {
                        err.into()
                    }
                })
        })
        .await
    }

    /// Looks up an authentication record, returning the user it corresponds to. Expired tokens
    /// are treated as nonexistent.
    pub async fn get_auth_user(&self, auth: Uuid) -> Result<User> {
        self.async_query(move |conn| {
            let (user, expires) = auths::table
                .inner_join(users::table)
                .filter(auths::id.eq(auth.to_string()))
                .select((users::all_columns, auths::expires))
                .first::<(User, Option<NaiveDateTime>)>(conn)
                .optional()?
                .ok_or(Error::NotFound("session"))?;
            match expires {
                Some(expires) if expires <= now() => Err(Error::NotFound("session")),
                _ => Ok(user),
            }
        })
        .await
    }

    /// Creates a group, adding the user to it as an admin, in a single transaction.
    pub async fn create_group(
        &self,
        user: i64,
        name: String,
        description: String,
    ) -> Result<TravelGroup> {
        self.async_query(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let now = now();
                let group: TravelGroup = insert_into(travel_groups::table)
                    .values((
                        travel_groups::name.eq(&name),
                        travel_groups::description.eq(&description),
                        travel_groups::created_by.eq(Some(user)),
                        travel_groups::created_at.eq(now),
                        travel_groups::updated_at.eq(now),
                    ))
                    .get_result(conn)?;
                let _ = insert_into(memberships::table)
                    .values((
                        memberships::group_id.eq(group.id),
                        memberships::user_id.eq(user),
                        memberships::is_admin.eq(true),
                        memberships::joined_at.eq(now),
                    ))
                    .execute(conn)?;
                Ok(group)
            })
        })
        .await
    }

    /// Gets a group by ID.
    pub async fn get_group(&self, group: i64) -> Result<TravelGroup> {
        self.async_query(move |conn| {
            travel_groups::table
                .find(group)
                .get_result(conn)
                .optional()?
                .ok_or(Error::NotFound("group"))
        })
        .await
    }

    /// Gets the user's membership in a group, if they have one.
    pub async fn get_membership(&self, user: i64, group: i64) -> Result<Option<Membership>> {
        self.async_query(move |conn| Ok(find_membership(conn, user, group)?))
            .await
    }

    /// Adds a user to a group, or returns their existing membership if they're already in it.
    pub async fn join_group(&self, user: i64, group: i64) -> Result<Membership> {
        self.async_query(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let exists = travel_groups::table
                    .find(group)
                    .select(travel_groups::id)
                    .first::<i64>(conn)
                    .optional()?
                    .is_some();
                if !exists {
                    return Err(Error::NotFound("group"));
                }

                if let Some(membership) = find_membership(conn, user, group)? {
                    return Ok(membership);
                }

                let r = insert_into(memberships::table)
                    .values((
                        memberships::group_id.eq(group),
                        memberships::user_id.eq(user),
                        memberships::is_admin.eq(false),
                        memberships::joined_at.eq(now()),
                    ))
                    .get_result(conn);
                match r {
                    Ok(membership) => Ok(membership),
                    Err(ref err) if is_unique_violation(err) => find_membership(conn, user, group)?
                        .ok_or(Error::NotFound("membership")),
                    Err(err) => Err(err.into()),
                }
            })
        })
        .await
    }

    /// Removes a user from a group. The last admin can't leave while other members remain; when
    /// the last member leaves, the group is deleted.
    pub async fn leave_group(&self, user: i64, group: i64) -> Result<()> {
        self.async_query(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let membership =
                    find_membership(conn, user, group)?.ok_or(Error::NotFound("group"))?;

                let others = memberships::table
                    .filter(memberships::group_id.eq(group))
                    .filter(memberships::user_id.ne(user))
                    .select(memberships::is_admin)
                    .load::<bool>(conn)?;
                if others.is_empty() {
                    let _ = delete(travel_groups::table.find(group)).execute(conn)?;
                    return Ok(());
                }
                if membership.is_admin && !others.iter().any(|&is_admin| is_admin) {
                    return Err(Error::Conflict(
                        "You are the group's only admin, so you can't leave it yet.".to_string(),
                    ));
                }

                let _ = delete(memberships::table.find(membership.id)).execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    /// Lists the groups a user belongs to, newest first.
    pub async fn list_groups(&self, user: i64) -> Result<Vec<GroupSummary>> {
        self.async_query(move |conn| {
            let groups = memberships::table
                .inner_join(travel_groups::table)
                .filter(memberships::user_id.eq(user))
                .order((travel_groups::created_at.desc(), travel_groups::id.desc()))
                .select((travel_groups::all_columns, memberships::is_admin))
                .load::<(TravelGroup, bool)>(conn)?;

            let ids = groups.iter().map(|(group, _)| group.id).collect::<Vec<_>>();
            let counts = memberships::table
                .filter(memberships::group_id.eq_any(&ids))
                .group_by(memberships::group_id)
                .select((memberships::group_id, count_star()))
                .load::<(i64, i64)>(conn)?
                .into_iter()
                .collect::<HashMap<_, _>>();

            Ok(groups
                .into_iter()
                .map(|(group, is_admin)| GroupSummary {
                    member_count: counts.get(&group.id).cloned().unwrap_or(0),
                    group,
                    is_admin,
                })
                .collect())
        })
        .await
    }

    /// Gets a group's members, in the order they joined.
    pub async fn list_members(&self, group: i64) -> Result<Vec<Member>> {
        self.async_query(move |conn| {
            Ok(memberships::table
                .inner_join(users::table)
                .filter(memberships::group_id.eq(group))
                .order(memberships::id)
                .select((
                    memberships::user_id,
                    users::name,
                    memberships::is_admin,
                    memberships::joined_at,
                ))
                .load(conn)?)
        })
        .await
    }

    /// Finds the place being referred to, creating it if it doesn't exist yet.
    pub async fn resolve_or_create_place(&self, place: PlaceRef) -> Result<Place> {
        self.async_query(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| resolve_place(conn, &place))
        })
        .await
    }

    /// Saves an existing place to a group.
    pub async fn link_place(
        &self,
        group: i64,
        place: i64,
        created_by: i64,
        fields: LinkFields,
    ) -> Result<GroupPlace> {
        self.async_query(move |conn| insert_link(conn, group, place, created_by, &fields))
            .await
    }

    /// Finds or creates a place and saves it to a group, in a single transaction. A blank
    /// nickname is replaced with the place's name.
    pub async fn save_place_to_group(
        &self,
        group: i64,
        place: PlaceRef,
        created_by: i64,
        mut fields: LinkFields,
    ) -> Result<(GroupPlace, Place)> {
        self.async_query(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let place = resolve_place(conn, &place)?;
                if fields.nickname.trim().is_empty() {
                    fields.nickname = place.name.clone();
                }
                let link = insert_link(conn, group, place.id, created_by, &fields)?;
                Ok((link, place))
            })
        })
        .await
    }

    /// Gets a group-place link and the place it refers to.
    pub async fn get_link(&self, link: i64) -> Result<(GroupPlace, Place)> {
        self.async_query(move |conn| {
            group_places::table
                .inner_join(places::table)
                .filter(group_places::id.eq(link))
                .select((group_places::all_columns, places::all_columns))
                .first(conn)
                .optional()?
                .ok_or(Error::NotFound("place"))
        })
        .await
    }

    /// Overwrites the group-scoped fields of a link. The shared place is left alone.
    pub async fn update_link(&self, link: i64, fields: LinkFields) -> Result<GroupPlace> {
        self.async_query(move |conn| {
            update(group_places::table.find(link))
                .set((
                    group_places::place_type.eq(fields.place_type),
                    group_places::nickname.eq(&fields.nickname),
                    group_places::description.eq(&fields.description),
                    group_places::updated_at.eq(now()),
                ))
                .get_result(conn)
                .optional()?
                .ok_or(Error::NotFound("place"))
        })
        .await
    }

    /// Removes a place from a group, along with the group's recommendations of it.
    pub async fn delete_link(&self, link: i64) -> Result<()> {
        self.async_query(move |conn| {
            let deleted = delete(group_places::table.find(link)).execute(conn)?;
            if deleted == 0 {
                Err(Error::NotFound("place"))
            } else {
                Ok(())
            }
        })
        .await
    }

    /// Lists the places saved to a group in the order they were saved, with their tallies and
    /// whether `viewer` recommends each.
    pub async fn list_group_places(&self, group: i64, viewer: i64) -> Result<Vec<PlaceEntry>> {
        self.async_query(move |conn| {
            let links = group_places::table
                .inner_join(places::table)
                .filter(group_places::group_id.eq(group))
                .order(group_places::id)
                .select((group_places::all_columns, places::all_columns))
                .load::<(GroupPlace, Place)>(conn)?;

            let ids = links.iter().map(|(link, _)| link.id).collect::<Vec<_>>();
            let counts = recommendations::table
                .filter(recommendations::link_id.eq_any(&ids))
                .group_by(recommendations::link_id)
                .select((recommendations::link_id, count_star()))
                .load::<(i64, i64)>(conn)?
                .into_iter()
                .collect::<HashMap<_, _>>();
            let mine = recommendations::table
                .filter(recommendations::link_id.eq_any(&ids))
                .filter(recommendations::user_id.eq(viewer))
                .select(recommendations::link_id)
                .load::<i64>(conn)?
                .into_iter()
                .collect::<HashSet<_>>();

            Ok(links
                .into_iter()
                .map(|(link, place)| PlaceEntry {
                    recommendations: counts.get(&link.id).cloned().unwrap_or(0),
                    recommended: mine.contains(&link.id),
                    link,
                    place,
                })
                .collect())
        })
        .await
    }

    /// Searches the saved places by name or address.
    pub async fn search_places(
        &self,
        query: String,
        by: SearchBy,
        limit: i64,
    ) -> Result<Vec<Place>> {
        self.async_query(move |conn| {
            let pattern = format!("%{}%", escape_like(query.trim()));
            let q = places::table.order(places::name).limit(limit);
            let found = match by {
                SearchBy::Name => q
                    .filter(places::name.like(&pattern).escape('\\'))
                    .load(conn)?,
                SearchBy::Address => q
                    .filter(places::address.like(&pattern).escape('\\'))
                    .load(conn)?,
            };
            Ok(found)
        })
        .await
    }

    /// Flips the user's recommendation of a link, returning the new state and tally.
    pub async fn toggle_recommendation(&self, user: i64, link: i64) -> Result<ToggleOutcome> {
        self.async_query(move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let removed = delete(
                    recommendations::table
                        .filter(recommendations::link_id.eq(link))
                        .filter(recommendations::user_id.eq(user)),
                )
                .execute(conn)?;

                let state = if removed > 0 {
                    RecommendState::Unrecommended
                } else {
                    let r = insert_into(recommendations::table)
                        .values((
                            recommendations::link_id.eq(link),
                            recommendations::user_id.eq(user),
                            recommendations::created_at.eq(now()),
                        ))
                        .execute(conn);
                    match r {
                        Ok(_) => {}
                        // Someone else's request got there first; the vote is there either way.
                        Err(ref err) if is_unique_violation(err) => {}
                        // The place was removed from the group after it was looked up.
                        Err(DieselError::DatabaseError(
                            DatabaseErrorKind::ForeignKeyViolation,
                            _,
                        )) => return Err(Error::NotFound("place")),
                        Err(err) => return Err(err.into()),
                    }
                    RecommendState::Recommended
                };

                let count = recommendations::table
                    .filter(recommendations::link_id.eq(link))
                    .count()
                    .get_result::<i64>(conn)?;
                Ok(ToggleOutcome { state, count })
            })
        })
        .await
    }

    /// Performs a query "asynchronously" (but not really). Diesel does not support async, so we
    /// use Tokio's blocking pool so the database operations don't block the reactor threads.
    ///
    /// The connection is checked out on the blocking thread too, since `Pool::get` itself blocks
    /// when the pool is exhausted.
    async fn async_query<F, T>(&self, func: F) -> Result<T>
    where
        F: 'static + FnOnce(&mut SqliteConnection) -> Result<T> + Send,
        T: 'static + Send,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            func(&mut conn)
        })
        .await?
    }
}

/// Per-connection settings. SQLite doesn't enforce foreign keys (and so doesn't cascade) unless
/// asked to, and fails immediately on lock contention unless given a timeout.
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

fn find_membership(
    conn: &mut SqliteConnection,
    user: i64,
    group: i64,
) -> QueryResult<Option<Membership>> {
    memberships::table
        .filter(memberships::group_id.eq(group))
        .filter(memberships::user_id.eq(user))
        .first(conn)
        .optional()
}

/// Looks a place up by its provider ID, then by its name and address, creating it if neither
/// matches.
fn resolve_place(conn: &mut SqliteConnection, place: &PlaceRef) -> Result<Place> {
    let new = match place {
        PlaceRef::Existing(id) => {
            return places::table
                .find(*id)
                .get_result(conn)
                .optional()?
                .ok_or(Error::NotFound("place"));
        }
        PlaceRef::New(new) => new,
    };

    if let Some(ref external_id) = new.external_id {
        let found = places::table
            .filter(places::external_id.eq(external_id))
            .first(conn)
            .optional()?;
        if let Some(found) = found {
            return Ok(found);
        }
    }

    let found = places::table
        .filter(places::name.eq(&new.name))
        .filter(places::address.eq(&new.address))
        .order(places::id)
        .first(conn)
        .optional()?;
    if let Some(found) = found {
        return Ok(found);
    }

    Ok(insert_into(places::table)
        .values((
            places::external_id.eq(&new.external_id),
            places::name.eq(&new.name),
            places::address.eq(&new.address),
            places::lat_e6.eq(new.lat_e6),
            places::lng_e6.eq(new.lng_e6),
            places::phone.eq(&new.phone),
            places::url.eq(&new.url),
            places::created_at.eq(now()),
        ))
        .get_result(conn)?)
}

fn insert_link(
    conn: &mut SqliteConnection,
    group: i64,
    place: i64,
    created_by: i64,
    fields: &LinkFields,
) -> Result<GroupPlace> {
    let now = now();
    insert_into(group_places::table)
        .values((
            group_places::group_id.eq(group),
            group_places::place_id.eq(place),
            group_places::created_by.eq(Some(created_by)),
            group_places::place_type.eq(fields.place_type),
            group_places::nickname.eq(&fields.nickname),
            group_places::description.eq(&fields.description),
            group_places::created_at.eq(now),
            group_places::updated_at.eq(now),
        ))
        .get_result(conn)
        .map_err(|err| match err {
            ref err if is_unique_violation(err) => {
                Error::Conflict("This place is already saved to this group.".to_string())
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                Error::NotFound("group")
            }
            err => err.into(),
        })
}

fn is_unique_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

/// Escapes the `LIKE` metacharacters in a string, using `\` as the escape character.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == '%' || ch == '_' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("100% _real_"), r"100\% \_real\_");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("Gyeongbokgung"), "Gyeongbokgung");
    }
}
