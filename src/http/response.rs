//! Augmented HTTP response
//!
//! [`Response`] owns the status, headers and body for one request and
//! provides the higher-level operations on top of them: header merging,
//! content negotiation, cookies, `Location`/`Link`, attachments and
//! redirects. It converts into a hyper response for the wire with
//! [`Response::into_hyper`].

use chrono::Utc;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue as WireValue};
use hyper::StatusCode;
use serde::Serialize;

use crate::error::{HttpError, ResponseError};
use crate::http::accept;
use crate::http::cookie::{self, CookieOptions};
use crate::http::disposition::content_disposition;
use crate::http::encode::encode_url;
use crate::http::escape::escape_html;
use crate::http::headers::{HeaderStore, HeaderValue};
use crate::http::mime;
use crate::http::request::Request;

/// Handler invoked with the request and the response it should fill in
pub type FormatHandler<'a> = Box<dyn FnOnce(&Request, &mut Response) + 'a>;

/// Ordered handlers for [`Response::format`]
///
/// Keys are MIME types (`application/json`) or shorthands (`json`, `html`,
/// `text`). Insertion order breaks ties between equally acceptable types.
#[derive(Default)]
pub struct Formats<'a> {
    handlers: Vec<(String, FormatHandler<'a>)>,
    fallback: Option<FormatHandler<'a>>,
}

impl<'a> Formats<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on(mut self, ty: &str, handler: impl FnOnce(&Request, &mut Response) + 'a) -> Self {
        self.handlers.push((ty.to_string(), Box::new(handler)));
        self
    }

    /// Handler used when no keyed type is acceptable
    #[must_use]
    pub fn fallback(mut self, handler: impl FnOnce(&Request, &mut Response) + 'a) -> Self {
        self.fallback = Some(Box::new(handler));
        self
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderStore,
    body: Bytes,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderStore::new(),
            body: Bytes::new(),
        }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub const fn status_code(&self) -> StatusCode {
        self.status
    }

    pub const fn headers(&self) -> &HeaderStore {
        &self.headers
    }

    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_header(
        &mut self,
        field: &str,
        value: impl Into<HeaderValue>,
    ) -> Result<&mut Self, ResponseError> {
        self.headers.set(field, value)?;
        Ok(self)
    }

    /// Set several headers at once, in iteration order
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> Result<&mut Self, ResponseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<HeaderValue>,
    {
        self.headers.set_all(headers)?;
        Ok(self)
    }

    pub fn get_header(&self, field: &str) -> Option<&HeaderValue> {
        self.headers.get(field)
    }

    pub fn append_header(
        &mut self,
        field: &str,
        value: impl Into<HeaderValue>,
    ) -> Result<&mut Self, ResponseError> {
        self.headers.append(field, value)?;
        Ok(self)
    }

    pub fn vary(&mut self, field: &str) -> Result<&mut Self, ResponseError> {
        self.headers.vary(field)?;
        Ok(self)
    }

    /// Set `Content-Type` from a MIME type, shorthand or extension
    pub fn content_type(&mut self, ty: &str) -> Result<&mut Self, ResponseError> {
        self.set_header("Content-Type", mime::normalize_type(ty))
    }

    /// Replace the body and set `Content-Length`
    pub fn send(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = body.into();
        self.headers
            .insert_trusted("Content-Length", self.body.len().to_string());
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, ResponseError> {
        let body = serde_json::to_vec(value)?;
        if !self.headers.contains("Content-Type") {
            self.set_header("Content-Type", "application/json")?;
        }
        Ok(self.send(body))
    }

    /// Set the status and send its reason phrase as plain text
    pub fn send_status(&mut self, status: StatusCode) -> &mut Self {
        let reason = status
            .canonical_reason()
            .map_or_else(|| status.as_str().to_string(), ToString::to_string);
        self.status = status;
        self.headers
            .insert_trusted("Content-Type", "text/plain; charset=utf-8".to_string());
        self.send(reason)
    }

    /// Append a `Set-Cookie` entry
    pub fn cookie(
        &mut self,
        req: &Request,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Result<&mut Self, ResponseError> {
        let set_cookie = cookie::build_set_cookie(name, value, options, req.secret(), Utc::now())?;
        self.append_header("Set-Cookie", set_cookie)
    }

    /// Append a cookie whose value is `j:` followed by `value` as JSON
    pub fn cookie_json<T: Serialize + ?Sized>(
        &mut self,
        req: &Request,
        name: &str,
        value: &T,
        options: &CookieOptions,
    ) -> Result<&mut Self, ResponseError> {
        let json = serde_json::to_string(value)?;
        self.cookie(req, name, &format!("j:{json}"), options)
    }

    /// Expire cookie `name` on the client
    pub fn clear_cookie(
        &mut self,
        req: &Request,
        name: &str,
        options: &CookieOptions,
    ) -> Result<&mut Self, ResponseError> {
        self.cookie(req, name, "", &options.cleared())
    }

    /// Set `Location`, resolving `back` against the referrer
    pub fn location(&mut self, req: &Request, url: &str) -> Result<&mut Self, ResponseError> {
        let target = if url == "back" {
            req.get("Referrer").unwrap_or("/")
        } else {
            url
        };
        self.set_header("Location", encode_url(target))
    }

    /// Append `<url>; rel="rel"` entries to `Link`
    pub fn links(&mut self, links: &[(&str, &str)]) -> Result<&mut Self, ResponseError> {
        if links.is_empty() {
            return Ok(self);
        }
        let mut value = self
            .get_header("Link")
            .map(HeaderValue::joined)
            .unwrap_or_default();
        for (rel, url) in links {
            if !value.is_empty() {
                value.push_str(", ");
            }
            value.push_str(&format!("<{url}>; rel=\"{rel}\""));
        }
        self.set_header("Link", value)
    }

    /// Mark the response as a download, optionally naming the file
    pub fn attachment(&mut self, filename: Option<&str>) -> Result<&mut Self, ResponseError> {
        self.set_header("Content-Disposition", content_disposition(filename))
    }

    /// Run the handler for the type the request's `Accept` header prefers
    ///
    /// Adds `Vary: Accept`. The chosen type becomes the `Content-Type`
    /// before its handler runs; the fallback handler leaves it unset. With
    /// nothing acceptable and no fallback, `on_error` gets a 406.
    pub fn format(
        &mut self,
        req: &Request,
        formats: Formats<'_>,
        on_error: impl FnOnce(HttpError),
    ) -> Result<&mut Self, ResponseError> {
        let Formats { handlers, fallback } = formats;
        let types: Vec<String> = handlers
            .iter()
            .map(|(key, _)| mime::normalize_type(key))
            .collect();
        let offered: Vec<&str> = types.iter().map(String::as_str).collect();
        let chosen = accept::preferred(req.get("accept"), &offered);

        self.vary("Accept")?;

        match chosen {
            Some(idx) => {
                let content_type = accept::accept_params(&types[idx], None).value;
                tracing::debug!(content_type = %content_type, "negotiated response format");
                self.set_header("Content-Type", content_type)?;
                if let Some((_, handler)) = handlers.into_iter().nth(idx) {
                    handler(req, &mut *self);
                }
            }
            None => match fallback {
                Some(handler) => handler(req, &mut *self),
                None => {
                    tracing::debug!(offered = ?types, "no acceptable response format");
                    on_error(HttpError::not_acceptable(types));
                }
            },
        }
        Ok(self)
    }

    /// Redirect with `302 Found`
    pub fn redirect(&mut self, req: &Request, url: &str) -> Result<&mut Self, ResponseError> {
        self.redirect_with_status(req, StatusCode::FOUND, url)
    }

    /// Redirect with `status`, negotiating a short text or HTML body
    ///
    /// Clients that accept neither get an empty body; the redirect itself is
    /// never turned into a 406.
    pub fn redirect_with_status(
        &mut self,
        req: &Request,
        status: StatusCode,
        url: &str,
    ) -> Result<&mut Self, ResponseError> {
        self.location(req, url)?;
        let address = self
            .get_header("Location")
            .map(HeaderValue::joined)
            .unwrap_or_default();

        let reason = status.canonical_reason().unwrap_or_default();
        let text = format!("{reason}. Redirecting to {address}");
        let escaped = escape_html(&address);
        let html = format!("<p>{reason}. Redirecting to <a href=\"{escaped}\">{escaped}</a></p>");

        let formats = Formats::new()
            .on("text", move |_, res| {
                res.send(text);
            })
            .on("html", move |_, res| {
                res.send(html);
            })
            .fallback(|_, res| {
                res.send(Bytes::new());
            });
        self.format(req, formats, |_| {})?;

        self.status = status;
        if req.is_head() {
            self.body = Bytes::new();
        }
        Ok(self)
    }

    /// Convert into a hyper response, one header line per value
    pub fn into_hyper(self) -> Result<hyper::Response<Full<Bytes>>, ResponseError> {
        let Self {
            status,
            headers,
            body,
        } = self;

        let mut response = hyper::Response::new(Full::new(body));
        *response.status_mut() = status;
        for (name, value) in headers.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ResponseError::InvalidHeaderName(name.to_string()))?;
            for v in value.values() {
                let wire = WireValue::from_str(v).map_err(|_| ResponseError::InvalidHeaderValue {
                    field: name.to_string(),
                    value: v.clone(),
                })?;
                response.headers_mut().append(header_name.clone(), wire);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn header<'a>(res: &'a Response, field: &str) -> Option<&'a str> {
        res.get_header(field).and_then(HeaderValue::as_str)
    }

    fn accepting(accept: &str) -> Request {
        Request::default().with_header("Accept", accept)
    }

    #[test]
    fn test_set_header_chain() {
        let mut res = Response::new();
        res.set_header("X-Foo", "bar")
            .unwrap()
            .set_header("Content-Type", "text/x-foo; charset=utf-8")
            .unwrap();
        assert_eq!(header(&res, "x-foo"), Some("bar"));
        assert_eq!(header(&res, "content-type"), Some("text/x-foo; charset=utf-8"));
    }

    #[test]
    fn test_set_headers_bulk() {
        let mut res = Response::new();
        res.set_headers([("X-Foo", "bar"), ("X-Bar", "baz")]).unwrap();
        assert_eq!(res.headers().len(), 2);
        assert_eq!(header(&res, "x-bar"), Some("baz"));
    }

    #[test]
    fn test_content_type_array_fails() {
        let mut res = Response::new();
        let err = res
            .set_header("content-type", vec!["text/html".to_string()])
            .unwrap_err();
        assert_eq!(err.to_string(), "Content-Type cannot be set to an Array");
    }

    #[test]
    fn test_content_type_shorthand() {
        let mut res = Response::new();
        res.content_type("json").unwrap();
        assert_eq!(header(&res, "Content-Type"), Some("application/json; charset=utf-8"));
        res.content_type(".png").unwrap();
        assert_eq!(header(&res, "Content-Type"), Some("image/png"));
        res.content_type("application/vnd.amazon.ebook").unwrap();
        assert_eq!(header(&res, "Content-Type"), Some("application/vnd.amazon.ebook"));
    }

    #[test]
    fn test_append_header_accumulates() {
        let mut res = Response::new();
        res.append_header("Link", "<http://localhost/>").unwrap();
        res.append_header("Link", ["<http://localhost:80/>", "<http://localhost:8080/>"])
            .unwrap();
        assert_eq!(
            res.get_header("link").unwrap().values(),
            ["<http://localhost/>", "<http://localhost:80/>", "<http://localhost:8080/>"]
        );
    }

    #[test]
    fn test_json_and_send_status() {
        let mut res = Response::new();
        res.json(&serde_json::json!({ "name": "tobi" })).unwrap();
        assert_eq!(res.body().as_ref(), br#"{"name":"tobi"}"#);
        assert_eq!(header(&res, "content-type"), Some("application/json; charset=utf-8"));
        assert_eq!(header(&res, "content-length"), Some("15"));

        let mut res = Response::new();
        res.send_status(StatusCode::NOT_FOUND);
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body().as_ref(), b"Not Found");
        assert_eq!(header(&res, "content-type"), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_cookies_accumulate() {
        let req = Request::default();
        let mut res = Response::new();
        res.cookie(&req, "name", "tobi", &CookieOptions::default())
            .unwrap()
            .cookie(&req, "age", "1", &CookieOptions::default())
            .unwrap();
        assert_eq!(
            res.get_header("Set-Cookie").unwrap().values(),
            ["name=tobi; Path=/", "age=1; Path=/"]
        );
    }

    #[test]
    fn test_cookie_max_age() {
        let req = Request::default();
        let mut res = Response::new();
        let options = CookieOptions {
            max_age: Some(31_536_000_000),
            ..CookieOptions::default()
        };
        let before = Utc::now();
        res.cookie(&req, "name", "tobi", &options).unwrap();
        let after = Utc::now();

        let set_cookie = header(&res, "Set-Cookie").unwrap();
        assert!(set_cookie.contains("Max-Age=31536000;"));
        let expires = set_cookie.rsplit("Expires=").next().unwrap();
        let expires = chrono::DateTime::parse_from_rfc2822(&expires.replace("GMT", "+0000"))
            .unwrap()
            .with_timezone(&Utc);
        let year = chrono::TimeDelta::milliseconds(31_536_000_000);
        let second = chrono::TimeDelta::seconds(1);
        assert!(expires >= before + year - second);
        assert!(expires <= after + year);
    }

    #[test]
    fn test_signed_cookie_needs_secret() {
        let options = CookieOptions {
            signed: true,
            ..CookieOptions::default()
        };
        let mut res = Response::new();
        let err = res
            .cookie(&Request::default(), "user", "tobi", &options)
            .unwrap_err();
        assert!(matches!(err, ResponseError::SecretRequired));
        assert!(res.get_header("Set-Cookie").is_none());

        let req = Request::default().with_secret(Some("keyboard cat".to_string()));
        res.cookie(&req, "user", "tobi", &options).unwrap();
        let value = header(&res, "Set-Cookie").unwrap();
        let raw = value.split(';').next().unwrap().trim_start_matches("user=");
        let raw = raw.replace("%3A", ":").replace("%2F", "/").replace("%2B", "+");
        assert_eq!(cookie::unsign(&raw, "keyboard cat").as_deref(), Some("tobi"));
    }

    #[test]
    fn test_cookie_json() {
        let mut res = Response::new();
        res.cookie_json(&Request::default(), "user", &serde_json::json!({ "name": "tobi" }), &CookieOptions::default())
            .unwrap();
        assert_eq!(
            header(&res, "Set-Cookie"),
            Some("user=j%3A%7B%22name%22%3A%22tobi%22%7D; Path=/")
        );
    }

    #[test]
    fn test_clear_cookie() {
        let mut res = Response::new();
        res.clear_cookie(&Request::default(), "cookie", &CookieOptions::default())
            .unwrap();
        assert_eq!(
            header(&res, "Set-Cookie"),
            Some("cookie=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
        );

        let mut res = Response::new();
        let options = CookieOptions {
            path: Some("/admin".to_string()),
            max_age: Some(1000),
            ..CookieOptions::default()
        };
        res.clear_cookie(&Request::default(), "sid", &options).unwrap();
        assert_eq!(
            header(&res, "Set-Cookie"),
            Some("sid=; Path=/admin; Expires=Thu, 01 Jan 1970 00:00:00 GMT")
        );
    }

    #[test]
    fn test_location_back() {
        let both = Request::default()
            .with_header("Referrer", "/a")
            .with_header("Referer", "/b");
        let mut res = Response::new();
        res.location(&both, "back").unwrap();
        assert_eq!(header(&res, "Location"), Some("/a"));

        let referer = Request::default().with_header("Referer", "/some/page.html");
        res.location(&referer, "back").unwrap();
        assert_eq!(header(&res, "Location"), Some("/some/page.html"));

        res.location(&Request::default(), "back").unwrap();
        assert_eq!(header(&res, "Location"), Some("/"));
    }

    #[test]
    fn test_location_encoding() {
        let req = Request::default();
        let mut res = Response::new();
        res.location(&req, "https://google.com?q=\u{2603} \u{00a7}10").unwrap();
        assert_eq!(header(&res, "Location"), Some("https://google.com?q=%E2%98%83%20%C2%A710"));

        res.location(&req, "https://google.com?q=%A710").unwrap();
        assert_eq!(header(&res, "Location"), Some("https://google.com?q=%A710"));
    }

    #[test]
    fn test_links_append_across_calls() {
        let mut res = Response::new();
        res.links(&[
            ("next", "http://api.example.com/users?page=2"),
            ("last", "http://api.example.com/users?page=5"),
        ])
        .unwrap();
        res.links(&[("prev", "http://api.example.com/users?page=1")])
            .unwrap();
        assert_eq!(
            header(&res, "Link"),
            Some(
                "<http://api.example.com/users?page=2>; rel=\"next\", \
                 <http://api.example.com/users?page=5>; rel=\"last\", \
                 <http://api.example.com/users?page=1>; rel=\"prev\""
            )
        );
    }

    #[test]
    fn test_attachment() {
        let mut res = Response::new();
        res.attachment(None).unwrap();
        assert_eq!(header(&res, "Content-Disposition"), Some("attachment"));
        res.attachment(Some("/path/to/image.png")).unwrap();
        assert_eq!(
            header(&res, "Content-Disposition"),
            Some("attachment; filename=\"image.png\"")
        );
        assert!(res.get_header("Content-Type").is_none());
    }

    #[test]
    fn test_attachment_non_ascii_is_ascii_on_wire() {
        let mut res = Response::new();
        res.attachment(Some("résumé.pdf")).unwrap();
        let wire = res.into_hyper().unwrap();
        let bytes = wire.headers()["content-disposition"].as_bytes();
        assert!(bytes.is_ascii());
        assert_eq!(
            bytes,
            b"attachment; filename=\"r?sum?.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_format_picks_preferred() {
        let req = accepting("text/html;q=.5, application/json");
        let mut res = Response::new();
        let formats = Formats::new()
            .on("text/plain", |_, res| {
                res.send("hey");
            })
            .on("text/html", |_, res| {
                res.send("<p>hey</p>");
            })
            .on("application/json", |_, res| {
                res.send(r#"{"message":"hey"}"#);
            });
        res.format(&req, formats, |_| panic!("should negotiate")).unwrap();
        assert_eq!(header(&res, "Content-Type"), Some("application/json; charset=utf-8"));
        assert_eq!(header(&res, "Vary"), Some("Accept"));
        assert_eq!(res.body().as_ref(), br#"{"message":"hey"}"#);
    }

    #[test]
    fn test_format_shorthand_and_wildcard() {
        let mut res = Response::new();
        let formats = Formats::new()
            .on("json", |_, res| {
                res.send("{}");
            })
            .on("html", |_, res| {
                res.send("<p></p>");
            });
        res.format(&accepting("text/*"), formats, |_| {}).unwrap();
        assert_eq!(header(&res, "Content-Type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_format_default_sets_no_content_type() {
        let mut res = Response::new();
        let formats = Formats::new()
            .on("text/html", |_, res| {
                res.send("html");
            })
            .fallback(|_, res| {
                res.send("default");
            });
        res.format(&accepting("image/png"), formats, |_| panic!("fallback exists"))
            .unwrap();
        assert_eq!(res.body().as_ref(), b"default");
        assert!(res.get_header("Content-Type").is_none());
    }

    #[test]
    fn test_format_not_acceptable() {
        let failure = RefCell::new(None);
        let mut res = Response::new();
        let formats = Formats::new()
            .on("text/html", |_, _| panic!("not acceptable"))
            .on("json", |_, _| panic!("not acceptable"));
        res.format(&accepting("image/png"), formats, |err| {
            *failure.borrow_mut() = Some(err);
        })
        .unwrap();

        let err = failure.into_inner().expect("error callback called");
        assert_eq!(err.status, StatusCode::NOT_ACCEPTABLE);
        assert_eq!(err.message, "Not Acceptable");
        assert_eq!(err.types, ["text/html", "application/json"]);
        assert!(res.body().is_empty());
    }

    #[test]
    fn test_redirect_unsupported_accept() {
        let mut res = Response::new();
        res.redirect(&accepting("image/jpeg"), "/login").unwrap();
        assert_eq!(res.status_code(), StatusCode::FOUND);
        assert_eq!(header(&res, "Location"), Some("/login"));
        assert!(res.body().is_empty());
        assert_eq!(header(&res, "Content-Length"), Some("0"));
    }

    #[test]
    fn test_redirect_text_body() {
        let mut res = Response::new();
        res.redirect(&accepting("text/plain, */*"), "http://google.com").unwrap();
        assert_eq!(header(&res, "Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.body().as_ref(), b"Found. Redirecting to http://google.com");
    }

    #[test]
    fn test_redirect_html_body_escapes() {
        let mut res = Response::new();
        res.redirect_with_status(
            &accepting("text/html"),
            StatusCode::MOVED_PERMANENTLY,
            "<la'me>",
        )
        .unwrap();
        assert_eq!(res.status_code(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(header(&res, "Location"), Some("%3Cla'me%3E"));
        assert_eq!(
            res.body().as_ref(),
            b"<p>Moved Permanently. Redirecting to <a href=\"%3Cla&#39;me%3E\">%3Cla&#39;me%3E</a></p>"
        );
    }

    #[test]
    fn test_redirect_head_has_no_body() {
        let req = Request::new(hyper::Method::HEAD, hyper::Uri::from_static("/"))
            .with_header("Accept", "text/plain");
        let mut res = Response::new();
        res.redirect(&req, "/next").unwrap();
        assert!(res.body().is_empty());
        assert_eq!(header(&res, "Content-Length"), Some("27"));
    }

    #[test]
    fn test_into_hyper_splits_multi_values() {
        let mut res = Response::new();
        res.append_header("Set-Cookie", "a=1").unwrap();
        res.append_header("Set-Cookie", "b=2").unwrap();
        res.status(StatusCode::CREATED).send("ok");

        let wire = res.into_hyper().unwrap();
        assert_eq!(wire.status(), StatusCode::CREATED);
        let cookies: Vec<_> = wire.headers().get_all("set-cookie").iter().collect();
        assert_eq!(cookies, ["a=1", "b=2"]);
        assert_eq!(wire.headers()["content-length"], "2");
    }
}
