//! Tests of the HTTP surface, using warp's test harness against an in-memory database.

use serde_json::Value;
use tripplat::{
    dal::{PlaceSearch, DB},
    logic,
    router::{routes, State},
    schema::{LinkFields, PlaceCandidate},
};
use uuid::Uuid;
use warp::{http::StatusCode, test::request};

struct Fixture {
    state: State,
    alice: (i64, Uuid),
    bob: (i64, Uuid),
    group: i64,
    link: i64,
}

async fn fixture() -> Fixture {
    let db = DB::connect(":memory:").unwrap();
    let (alice, alice_token) = logic::auth::register(&db, "alice".to_string())
        .await
        .unwrap();
    let (bob, bob_token) = logic::auth::register(&db, "bob".to_string())
        .await
        .unwrap();
    let group = logic::membership::create_group(
        &db,
        alice.id,
        "Seoul Trip".to_string(),
        "Spring break".to_string(),
    )
    .await
    .unwrap();
    let candidate = PlaceCandidate {
        name: "Gyeongbokgung".to_string(),
        address: "161 Sajik-ro, Jongno-gu, Seoul".to_string(),
        lat: Some(37.579),
        lng: Some(126.977),
        ..PlaceCandidate::default()
    };
    let (link, _) =
        logic::places::save_place(&db, alice.id, group.id, &candidate, LinkFields::default())
            .await
            .unwrap();

    Fixture {
        state: State {
            db,
            search: PlaceSearch::disabled(),
            map_key: None,
        },
        alice: (alice.id, alice_token),
        bob: (bob.id, bob_token),
        group: group.id,
        link: link.id,
    }
}

fn cookie(token: Uuid) -> String {
    format!("auth={}", token)
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn index_needs_no_login() {
    let fx = fixture().await;
    let resp = request().path("/").reply(&routes(fx.state)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn pages_need_a_login() {
    let fx = fixture().await;
    let routes = routes(fx.state);

    let resp = request().path("/groups").reply(&routes).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = request()
        .path("/groups")
        .header("cookie", cookie(Uuid::new_v4()))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = request()
        .path("/groups")
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(String::from_utf8_lossy(resp.body()).contains("Seoul Trip"));
}

#[tokio::test]
async fn non_members_cant_see_groups() {
    let fx = fixture().await;
    let routes = routes(fx.state);
    let path = format!("/groups/{}", fx.group);

    let resp = request()
        .path(&path)
        .header("cookie", cookie(fx.bob.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(!String::from_utf8_lossy(resp.body()).contains("Gyeongbokgung"));

    let resp = request()
        .path(&path)
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(String::from_utf8_lossy(resp.body()).contains("Gyeongbokgung"));
}

#[tokio::test]
async fn joining_redirects_to_the_group() {
    let fx = fixture().await;
    let routes = routes(fx.state.clone());

    let resp = request()
        .method("POST")
        .path(&format!("/groups/{}/join", fx.group))
        .header("cookie", cookie(fx.bob.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers()["location"],
        format!("/groups/{}", fx.group).as_str()
    );
    assert!(logic::membership::is_member(&fx.state.db, fx.bob.0, fx.group)
        .await
        .unwrap());
}

#[tokio::test]
async fn recommending() {
    let fx = fixture().await;
    let routes = routes(fx.state.clone());
    let path = format!("/links/{}/recommend", fx.link);

    let resp = request()
        .method("POST")
        .path(&path)
        .header("cookie", cookie(fx.bob.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(resp.body())["success"], false);

    let resp = request()
        .method("POST")
        .path(&path)
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp.body());
    assert_eq!(body["state"], "recommended");
    assert_eq!(body["count"], 1);

    let resp = request()
        .method("POST")
        .path("/links/9999/recommend")
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn editing_someone_elses_place() {
    let fx = fixture().await;
    let routes = routes(fx.state.clone());
    let path = format!("/links/{}/edit", fx.link);

    // Outsiders can't tell a link from a missing one.
    let resp = request()
        .path(&path)
        .header("cookie", cookie(fx.bob.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = request()
        .path("/links/9999/edit")
        .header("cookie", cookie(fx.bob.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let _ = logic::membership::join(&fx.state.db, fx.bob.0, fx.group)
        .await
        .unwrap();
    let resp = request()
        .path(&path)
        .header("cookie", cookie(fx.bob.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = request()
        .path(&path)
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn places_json() {
    let fx = fixture().await;
    let routes = routes(fx.state);

    let resp = request()
        .path(&format!("/groups/{}/places.json", fx.group))
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp.body());
    let place = &body["places"][0];
    assert_eq!(place["link_id"], fx.link);
    assert_eq!(place["name"], "Gyeongbokgung");
    assert_eq!(place["lat"], 37.579);
    assert_eq!(place["placeType"], "OTHER");
    assert_eq!(place["recommendations"], 0);
}

#[tokio::test]
async fn saving_a_place_by_form() {
    let fx = fixture().await;
    let routes = routes(fx.state.clone());
    let path = format!("/groups/{}/places", fx.group);

    let resp = request()
        .method("POST")
        .path(&path)
        .header("cookie", cookie(fx.alice.1))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=N+Seoul+Tower&address=105+Namsangongwon-gil&lat=37.5512&lng=126.9882&place_type=ATTRACTION")
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let resp = request()
        .method("POST")
        .path(&path)
        .header("cookie", cookie(fx.alice.1))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Nowhere&address=&lat=north&lng=")
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let entries = logic::places::list_group_places(&fx.state.db, fx.alice.0, fx.group)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn top_places_page() {
    let fx = fixture().await;
    let routes = routes(fx.state);

    let resp = request()
        .path(&format!("/groups/{}/top?n=5", fx.group))
        .header("cookie", cookie(fx.alice.1))
        .reply(&routes)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(String::from_utf8_lossy(resp.body()).contains("Gyeongbokgung"));
}

#[tokio::test]
async fn static_assets_are_served() {
    let fx = fixture().await;
    let resp = request()
        .path("/static/style.css")
        .reply(&routes(fx.state))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/css; charset=utf-8");
}
