//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: builds a [`Request`] view, runs
//! the matching route against a fresh [`Response`] and converts the result
//! for hyper.
//!
//! Routes:
//! - configured redirects (exact path match)
//! - `/` negotiated greeting with `Link` headers
//! - `/back` redirect to the referrer
//! - `/login?name=...` signed session cookie, then redirect
//! - `/logout` clears the session cookie
//! - `/whoami` reads the signed session cookie back
//! - `/files/<path>` download from the configured root

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Method, StatusCode};
use percent_encoding::percent_decode_str;
use std::cell::Cell;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use respkit::config::AppState;
use respkit::http::cookie;
use respkit::http::{CookieOptions, Formats, Request, Response};
use respkit::logger;
use respkit::ResponseError;

const SESSION_COOKIE: &str = "user";

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: hyper::Request<Incoming>,
    state: Arc<AppState>,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, _body) = req.into_parts();
    logger::log_headers_count(parts.headers.len(), state.config.logging.show_headers);

    let request = Request::from_parts(&parts)
        .with_secret(state.cookie_secret().map(ToString::to_string));

    let mut response = Response::new();
    if let Err(err) = route(&request, &state, &mut response).await {
        logger::log_error(&format!(
            "{} {} failed: {err}",
            request.method(),
            request.uri().path()
        ));
        response = Response::new();
        response.send_status(err.status());
    }
    if let Err(err) = response.set_header("Server", state.config.http.server_name.as_str()) {
        logger::log_warning(&format!("Skipping Server header: {err}"));
    }

    if state.config.logging.access_log {
        logger::log_request(
            request.method(),
            request.uri().path(),
            response.status_code(),
            response.body().len(),
            started.elapsed(),
        );
    }
    Ok(finish(response))
}

/// Dispatch to the route for `req`
pub async fn route(
    req: &Request,
    state: &AppState,
    res: &mut Response,
) -> Result<(), ResponseError> {
    let path = req.uri().path();

    if let Some(redirect) = state.config.routes.redirects.iter().find(|r| r.path == path) {
        let status = StatusCode::from_u16(redirect.code).unwrap_or(StatusCode::FOUND);
        res.redirect_with_status(req, status, &redirect.target)?;
        return Ok(());
    }

    if req.method() != Method::GET && !req.is_head() {
        logger::log_warning(&format!("Method not allowed: {}", req.method()));
        res.set_header("Allow", "GET, HEAD")?;
        res.send_status(StatusCode::METHOD_NOT_ALLOWED);
        return Ok(());
    }

    match path {
        "/" => index(req, res)?,
        "/back" => {
            res.redirect(req, "back")?;
        }
        "/login" => login(req, state, res)?,
        "/logout" => {
            res.clear_cookie(req, SESSION_COOKIE, &state.config.cookies.defaults)?;
            res.redirect(req, "/")?;
        }
        "/whoami" => whoami(req, state, res)?,
        _ => match path.strip_prefix("/files/").filter(|file| !file.is_empty()) {
            Some(file) => {
                let file = percent_decode_str(file).decode_utf8_lossy();
                res.download(&file, None, &state.download).await?;
            }
            None => {
                res.send_status(StatusCode::NOT_FOUND);
            }
        },
    }
    Ok(())
}

fn index(req: &Request, res: &mut Response) -> Result<(), ResponseError> {
    res.links(&[("self", "/"), ("related", "/whoami")])?;

    let failure = Cell::new(None);
    let formats = Formats::new()
        .on("text", |_, res| {
            res.send("respkit demo\n");
        })
        .on("html", |_, res| {
            res.send("<h1>respkit demo</h1>");
        })
        .on("json", |_, res| {
            res.send(r#"{"name":"respkit"}"#);
        });
    res.format(req, formats, |err| failure.set(Some(err)))?;

    if let Some(err) = failure.take() {
        res.send_status(err.status);
    }
    Ok(())
}

fn login(req: &Request, state: &AppState, res: &mut Response) -> Result<(), ResponseError> {
    let name = query_param(req.uri().query(), "name").unwrap_or_else(|| "guest".to_string());
    let options = CookieOptions {
        signed: true,
        ..state.config.cookies.defaults.clone()
    };
    res.cookie(req, SESSION_COOKIE, &name, &options)?;
    res.redirect(req, "/whoami")?;
    Ok(())
}

fn whoami(req: &Request, state: &AppState, res: &mut Response) -> Result<(), ResponseError> {
    let user = req
        .get("cookie")
        .and_then(|header| cookie_value(header, SESSION_COOKIE))
        .zip(state.cookie_secret())
        .and_then(|(raw, secret)| cookie::unsign(&raw, secret));
    res.json(&serde_json::json!({ "user": user }))?;
    Ok(())
}

/// Find `name` in a `Cookie` request header and decode its value
fn cookie_value(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy().into_owned())
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            percent_decode_str(&value.replace('+', " "))
                .decode_utf8_lossy()
                .into_owned()
        })
}

/// Convert for the wire, answering 500 if a header cannot be encoded
fn finish(response: Response) -> hyper::Response<Full<Bytes>> {
    response.into_hyper().unwrap_or_else(|err| {
        logger::log_error(&format!("Failed to build response: {err}"));
        let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
            b"Internal Server Error",
        )));
        *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        fallback
    })
}
