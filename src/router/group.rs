use crate::{
    error::Error,
    logic,
    router::{
        auth::auth,
        util::{redirect, with, ResultExt},
        State,
    },
    schema::{PlaceEntry, User},
    view::{place_type_options, render_html, render_html_with_status},
};
use serde_derive::Deserialize;
use serde_json::{json, Value};
use warp::{
    http::StatusCode,
    path,
    reply::Reply,
    Filter, Rejection,
};

/// Every route under `/groups`.
pub fn routes(state: State) -> Resp!() {
    list(state.clone())
        .or(create_form(state.clone()))
        .or(create(state.clone()))
        .or(detail(state.clone()))
        .or(places(state.clone()))
        .or(places_json(state.clone()))
        .or(map(state.clone()))
        .or(top(state.clone()))
        .or(join(state.clone()))
        .or(leave(state))
        .boxed()
}

/// The route listing the user's groups.
pub fn list(state: State) -> Resp!() {
    path!("groups")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|me: User, state: State| async move {
            let groups = logic::membership::list_groups(&state.db, me.id)
                .await
                .err_to_rejection()?;
            render_html("groups.html", json!({ "me": me, "groups": groups }))
        })
        .boxed()
}

/// The form for creating a group.
pub fn create_form(state: State) -> Resp!() {
    path!("groups" / "new")
        .and(warp::get())
        .and(auth(state.db))
        .and_then(|me: User| async move {
            render_html(
                "group-create.html",
                json!({ "me": me, "form": {}, "errors": [] }),
            )
        })
        .boxed()
}

/// The route for creating a group.
pub fn create(state: State) -> Resp!() {
    #[derive(Debug, Deserialize)]
    struct Form {
        name: String,
        #[serde(default)]
        description: String,
    }

    path!("groups" / "new")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::form())
        .and_then(|me: User, state: State, form: Form| async move {
            let result = logic::membership::create_group(
                &state.db,
                me.id,
                form.name.clone(),
                form.description.clone(),
            )
            .await;
            match result {
                Ok(group) => Ok(redirect(&format!("/groups/{}", group.id))),
                Err(Error::Validation(errors)) => render_html_with_status(
                    StatusCode::BAD_REQUEST,
                    "group-create.html",
                    json!({
                        "me": me,
                        "form": { "name": form.name, "description": form.description },
                        "errors": errors,
                    }),
                ),
                Err(err) => Err(warp::reject::custom(err)),
            }
        })
        .boxed()
}

/// A group's page: its members and its places.
pub fn detail(state: State) -> Resp!() {
    path!("groups" / i64)
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|group: i64, me: User, state: State| async move {
            let detail = logic::membership::group_detail(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            render_html(
                "group-detail.html",
                json!({
                    "me": me,
                    "group": detail.group,
                    "membership": detail.me,
                    "members": detail.members,
                    "places": entries_json(&detail.places),
                    "place_types": place_type_options(),
                }),
            )
        })
        .boxed()
}

/// The list of a group's places.
pub fn places(state: State) -> Resp!() {
    path!("groups" / i64 / "places")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|group: i64, me: User, state: State| async move {
            let detail = logic::membership::group_detail(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            render_html(
                "group-places.html",
                json!({
                    "me": me,
                    "group": detail.group,
                    "membership": detail.me,
                    "places": entries_json(&detail.places),
                }),
            )
        })
        .boxed()
}

/// A group's places as JSON, for the map.
pub fn places_json(state: State) -> Resp!() {
    path!("groups" / i64 / "places.json")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|group: i64, me: User, state: State| async move {
            let places = logic::places::list_group_places(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            let body = json!({ "places": entries_json(&places) });
            Ok::<_, Rejection>(warp::reply::json(&body).into_response())
        })
        .boxed()
}

/// The map of a group's places.
pub fn map(state: State) -> Resp!() {
    path!("groups" / i64 / "map")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|group: i64, me: User, state: State| async move {
            let group = logic::membership::get_group(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            render_html(
                "group-map.html",
                json!({ "me": me, "group": group, "map_key": state.map_key }),
            )
        })
        .boxed()
}

/// A group's most-recommended places.
pub fn top(state: State) -> Resp!() {
    #[derive(Debug, Deserialize)]
    struct Query {
        n: Option<usize>,
    }

    path!("groups" / i64 / "top")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and(warp::query())
        .and_then(|group: i64, me: User, state: State, query: Query| async move {
            let places = logic::ranking::top_places(&state.db, me.id, group, query.n)
                .await
                .err_to_rejection()?;
            let group = logic::membership::get_group(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            render_html(
                "group-top.html",
                json!({ "me": me, "group": group, "places": entries_json(&places) }),
            )
        })
        .boxed()
}

/// The route for joining a group.
pub fn join(state: State) -> Resp!() {
    path!("groups" / i64 / "join")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|group: i64, me: User, state: State| async move {
            let _ = logic::membership::join(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            Ok::<_, Rejection>(redirect(&format!("/groups/{}", group)))
        })
        .boxed()
}

/// The route for leaving a group.
pub fn leave(state: State) -> Resp!() {
    path!("groups" / i64 / "leave")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|group: i64, me: User, state: State| async move {
            logic::membership::leave(&state.db, me.id, group)
                .await
                .err_to_rejection()?;
            Ok::<_, Rejection>(redirect("/groups"))
        })
        .boxed()
}

/// Flattens places for templates and scripts, which want one object per place.
fn entries_json(entries: &[PlaceEntry]) -> Value {
    entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.link.id,
                "link_id": entry.link.id,
                "place_id": entry.place.id,
                "name": entry.display_name(),
                "placeName": entry.place.name,
                "address": entry.place.address,
                "lat": entry.place.lat(),
                "lng": entry.place.lng(),
                "phone": entry.place.phone,
                "url": entry.place.url,
                "placeType": entry.link.place_type,
                "description": entry.link.description,
                "createdBy": entry.link.created_by,
                "createdAt": entry.link.created_at,
                "recommendations": entry.recommendations,
                "recommended": entry.recommended,
            })
        })
        .collect()
}
