//! The HTTP server.
//!
//! > **Router** is the the only module that knows anything about HTTP. Every other part of the
//! > system has no knowledge of how the request is really being made. The router's responsibility
//! > is to call into the domain logic, and then render that response data with an appropriate view.

mod auth;
mod errors;
mod group;
mod place;
mod util;

use crate::{
    dal::{PlaceSearch, DB},
    logic,
    router::util::{with, ResultExt},
    schema::User,
    view::render_html,
};
use failure::Fallible;
use log::{info, warn};
use packer::Packer;
use serde_json::json;
use std::net::SocketAddr;
use warp::{
    http::header::CONTENT_TYPE,
    path,
    reply::{Reply, Response},
    Filter, Rejection,
};

/// Everything a request handler might need.
#[derive(Clone, Debug)]
pub struct State {
    /// The database.
    pub db: DB,

    /// The external place-search provider.
    pub search: PlaceSearch,

    /// The JavaScript key for the map on the map page, if maps are set up.
    pub map_key: Option<String>,
}

/// Starts an HTTP server at the given address, running until interrupted.
pub async fn serve_on(addr: SocketAddr, state: State) -> Fallible<()> {
    let server = warp::serve(routes(state).with(warp::log("tripplat::router")));
    let (addr, server) = server.try_bind_with_graceful_shutdown(addr, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Interrupted; shutting down...");
    })?;
    info!("Serving on http://{}", addr);
    server.await;
    warn!("HTTP server exited");
    Ok(())
}

/// All the routes, with errors rendered to pages.
pub fn routes(state: State) -> Resp!() {
    statics()
        .or(index(state.clone()))
        .or(group::routes(state.clone()))
        .or(place::routes(state))
        .recover(errors::recover)
        .boxed()
}

fn index(state: State) -> impl Clone + Filter<Extract = (Response,), Error = Rejection> {
    path::end()
        .and(warp::get())
        .and(auth::auth_opt(state.db.clone()))
        .and(with(state))
        .and_then(|me: Option<User>, state: State| async move {
            let groups = match me {
                Some(ref me) => logic::membership::list_groups(&state.db, me.id)
                    .await
                    .err_to_rejection()?,
                None => Vec::new(),
            };
            render_html("index.html", json!({ "me": me, "groups": groups }))
        })
}

fn statics() -> impl Clone + Filter<Extract = (Response,), Error = Rejection> {
    #[derive(Packer)]
    #[folder = "src/static"]
    struct Assets;

    warp::path("static")
        .and(warp::get())
        .and(warp::path::tail())
        .and_then(|path: warp::path::Tail| async move {
            let body = Assets::get(path.as_str())
                .ok_or_else(warp::reject::not_found)?
                .to_vec();
            let mime = match path.as_str().rsplit('.').next() {
                Some("css") => "text/css; charset=utf-8",
                Some("js") => "application/javascript; charset=utf-8",
                _ => "application/octet-stream",
            };
            Ok::<_, Rejection>(warp::reply::with_header(body, CONTENT_TYPE, mime).into_response())
        })
}
