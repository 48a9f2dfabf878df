use crate::{
    error::{Error, Result},
    logic,
    router::{
        auth::auth,
        errors::{json_error, status_of},
        util::{parse_opt_f64, parse_opt_i64, redirect, with, ResultExt},
        State,
    },
    schema::{PlaceCandidate, SearchBy, TravelGroup, User},
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

/// Every route for finding, saving, editing and recommending places.
pub fn routes(state: State) -> Resp!() {
    search_page(state.clone())
        .or(search_json(state.clone()))
        .or(save(state.clone()))
        .or(edit_form(state.clone()))
        .or(edit(state.clone()))
        .or(delete(state.clone()))
        .or(recommend(state))
        .boxed()
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    by: SearchBy,
}

/// The page for searching for places to save to a group.
pub fn search_page(state: State) -> Resp!() {
    path!("groups" / i64 / "places" / "new")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and(warp::query())
        .and_then(
            |group: i64, me: User, state: State, query: SearchQuery| async move {
                let group = logic::membership::get_group(&state.db, me.id, group)
                    .await
                    .err_to_rejection()?;
                let results = logic::places::search(
                    &state.db,
                    &state.search,
                    me.id,
                    group.id,
                    &query.q,
                    query.by,
                )
                .await
                .err_to_rejection()?;
                render_html(
                    "place-search.html",
                    search_context(&me, &group, &query, &results, json!({}), json!([])),
                )
            },
        )
        .boxed()
}

/// Search results as JSON, for the search page's script.
pub fn search_json(state: State) -> Resp!() {
    path!("groups" / i64 / "places" / "search.json")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and(warp::query())
        .and_then(
            |group: i64, me: User, state: State, query: SearchQuery| async move {
                let result = logic::places::search(
                    &state.db,
                    &state.search,
                    me.id,
                    group,
                    &query.q,
                    query.by,
                )
                .await;
                Ok::<_, Rejection>(match result {
                    Ok(results) => warp::reply::json(&json!({ "results": results }))
                        .into_response(),
                    Err(err) => json_error(err),
                })
            },
        )
        .boxed()
}

/// The route for saving a place to a group.
pub fn save(state: State) -> Resp!() {
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Form {
        id: String,
        external_id: String,
        name: String,
        address: String,
        lat: String,
        lng: String,
        phone: String,
        url: String,
        place_type: String,
        nickname: String,
        description: String,
    }

    path!("groups" / i64 / "places")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::form())
        .and_then(|group: i64, me: User, state: State, form: Form| async move {
            let candidate = PlaceCandidate {
                id: parse_opt_i64(&form.id),
                external_id: Some(form.external_id.clone()).filter(|s| !s.trim().is_empty()),
                name: form.name.clone(),
                address: form.address.clone(),
                lat: parse_opt_f64(&form.lat),
                lng: parse_opt_f64(&form.lng),
                phone: Some(form.phone.clone()).filter(|s| !s.trim().is_empty()),
                url: Some(form.url.clone()).filter(|s| !s.trim().is_empty()),
            };
            let result = save_candidate(
                &state,
                me.id,
                group,
                &candidate,
                (&form.place_type[..], &form.nickname[..], &form.description[..]),
            )
            .await;

            match result {
                Ok(()) => Ok(redirect(&format!("/groups/{}/places", group))),
                Err(err @ Error::Validation(_)) | Err(err @ Error::Conflict(_)) => {
                    let group = logic::membership::get_group(&state.db, me.id, group)
                        .await
                        .err_to_rejection()?;
                    let errors = match err {
                        Error::Validation(ref errors) => json!(errors),
                        ref err => json!([{ "field": "place", "message": err.to_string() }]),
                    };
                    let form = json!({
                        "name": form.name,
                        "address": form.address,
                        "lat": form.lat,
                        "lng": form.lng,
                        "phone": form.phone,
                        "url": form.url,
                        "place_type": form.place_type,
                        "nickname": form.nickname,
                        "description": form.description,
                    });
                    render_html_with_status(
                        status_of(&err),
                        "place-search.html",
                        search_context(
                            &me,
                            &group,
                            &SearchQuery::default(),
                            &[],
                            form,
                            errors,
                        ),
                    )
                }
                Err(err) => Err(warp::reject::custom(err)),
            }
        })
        .boxed()
}

/// The form for editing what a group says about a place.
pub fn edit_form(state: State) -> Resp!() {
    path!("links" / i64 / "edit")
        .and(warp::get())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|link: i64, me: User, state: State| async move {
            let (link, place) = logic::places::get_link_for_edit(&state.db, me.id, link)
                .await
                .err_to_rejection()?;
            render_html(
                "place-edit.html",
                json!({
                    "me": me,
                    "link": link,
                    "place": place,
                    "form": {
                        "place_type": link.place_type,
                        "nickname": link.nickname,
                        "description": link.description,
                    },
                    "place_types": place_type_options(),
                    "errors": [],
                }),
            )
        })
        .boxed()
}

/// The route for editing what a group says about a place.
pub fn edit(state: State) -> Resp!() {
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Form {
        place_type: String,
        nickname: String,
        description: String,
    }

    path!("links" / i64 / "edit")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::form())
        .and_then(|link: i64, me: User, state: State, form: Form| async move {
            let result = match logic::places::parse_link_fields(
                &form.place_type,
                &form.nickname,
                &form.description,
            ) {
                Ok(fields) => logic::places::update_link(&state.db, me.id, link, fields).await,
                Err(err) => Err(err),
            };

            match result {
                Ok(link) => Ok(redirect(&format!("/groups/{}/places", link.group_id))),
                Err(Error::Validation(errors)) => {
                    let (link, place) = logic::places::get_link_for_edit(&state.db, me.id, link)
                        .await
                        .err_to_rejection()?;
                    render_html_with_status(
                        StatusCode::BAD_REQUEST,
                        "place-edit.html",
                        json!({
                            "me": me,
                            "link": link,
                            "place": place,
                            "form": {
                                "place_type": form.place_type,
                                "nickname": form.nickname,
                                "description": form.description,
                            },
                            "place_types": place_type_options(),
                            "errors": errors,
                        }),
                    )
                }
                Err(err) => Err(warp::reject::custom(err)),
            }
        })
        .boxed()
}

/// The route for removing a place from a group.
pub fn delete(state: State) -> Resp!() {
    path!("links" / i64 / "delete")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|link: i64, me: User, state: State| async move {
            let group = logic::places::delete_link(&state.db, me.id, link)
                .await
                .err_to_rejection()?;
            Ok::<_, Rejection>(redirect(&format!("/groups/{}/places", group)))
        })
        .boxed()
}

/// The route for recommending a place, or taking a recommendation back.
pub fn recommend(state: State) -> Resp!() {
    path!("links" / i64 / "recommend")
        .and(warp::post())
        .and(auth(state.db.clone()))
        .and(with(state))
        .and_then(|link: i64, me: User, state: State| async move {
            let result = logic::recommend::toggle(&state.db, me.id, link).await;
            Ok::<_, Rejection>(match result {
                Ok(outcome) => warp::reply::json(&outcome).into_response(),
                Err(err) => json_error(err),
            })
        })
        .boxed()
}

async fn save_candidate(
    state: &State,
    user: i64,
    group: i64,
    candidate: &PlaceCandidate,
    (place_type, nickname, description): (&str, &str, &str),
) -> Result<()> {
    let fields = logic::places::parse_link_fields(place_type, nickname, description)?;
    let _ = logic::places::save_place(&state.db, user, group, candidate, fields).await?;
    Ok(())
}

fn search_context(
    me: &User,
    group: &TravelGroup,
    query: &SearchQuery,
    results: &[PlaceCandidate],
    form: Value,
    errors: Value,
) -> Value {
    json!({
        "me": me,
        "group": group,
        "query": query.q,
        "by": query.by,
        "results": results,
        "form": form,
        "errors": errors,
        "place_types": place_type_options(),
    })
}
