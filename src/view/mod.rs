//! Rendering to templates.
//!
//! > View is the only module that knows anything about HTML, or JSON, or other "renderings" of the
//! > response. I'm happy to call this "view" in common with traditional stateless MVC, because
//! > it's role is largely the same.

use crate::{error::Error, schema::PlaceType};
use chrono::{NaiveDateTime, Utc};
use chrono_humanize::HumanTime;
use failure::Fallible;
use packer::Packer;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tera::{Context, Tera};
use warp::{
    http::StatusCode,
    reject::custom,
    reply::{html, Reply, Response},
    Rejection,
};

lazy_static::lazy_static! {
    static ref TERA: Tera = {
        #[derive(Packer)]
        #[folder = "src/view/templates"]
        struct Templates;

        let mut tera = Tera::default();
        let templates = Templates::list()
            .map(|name| (name, Templates::get_str(name).unwrap()))
            .collect::<Vec<_>>();
        tera.add_raw_templates(templates).unwrap();
        tera.register_filter("humantime", humantime);
        tera.register_filter("place_type_label", place_type_label);
        tera
    };
}

/// Renders a template as HTML to a String.
pub fn render<T: Serialize>(name: &str, data: T) -> Fallible<String> {
    let ctx = Context::from_serialize(data)?;
    Ok(TERA.render(name, &ctx)?)
}

/// Renders a template as HTML to a `warp::Reply`.
pub fn render_html<T: Serialize>(name: &str, data: T) -> Result<Response, Rejection> {
    render(name, data)
        .map(|body| html(body).into_response())
        .map_err(|err| custom(Error::Internal(err)))
}

/// Renders a template as HTML to a `warp::Reply` with the given status.
pub fn render_html_with_status<T: Serialize>(
    status: StatusCode,
    name: &str,
    data: T,
) -> Result<Response, Rejection> {
    let mut resp = render_html(name, data)?;
    *resp.status_mut() = status;
    Ok(resp)
}

/// The choices for a place type dropdown.
pub fn place_type_options() -> Value {
    PlaceType::ALL
        .iter()
        .map(|ty| json!({ "value": ty.as_str(), "label": ty.label() }))
        .collect()
}

/// Formats a timestamp relative to now, e.g. "3 days ago".
fn humantime(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("humantime expects a timestamp string"))?;
    let when = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|err| tera::Error::msg(format!("Bad timestamp {:?}: {}", s, err)))?;
    let ago = HumanTime::from(when - Utc::now().naive_utc());
    Ok(Value::String(ago.to_string()))
}

/// Turns a stored place type into its human-readable label.
fn place_type_label(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let label = value
        .as_str()
        .and_then(|s| s.parse::<PlaceType>().ok())
        .unwrap_or_default()
        .label();
    Ok(Value::String(label.to_string()))
}
