//! Translating HTTP requests into resource requests.
//!
//! # Responsibilities
//! - Map HTTP methods and protocol parameters onto request kinds
//! - Turn conditional headers into revisions
//! - Build the context chain: root → http → [locale] → apiVersion → advice
//!
//! # Design Decisions
//! - Protocol parameters start with `_` and match case-insensitively
//! - Anything unrecognised becomes an additional parameter, so reserved
//!   names are refused by the request builder rather than silently dropped
//! - Unsupported conditional headers are rejected, never ignored

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, Method};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::context::{
    AcceptApiVersion, AdviceFrame, ApiVersionFrame, Context, HttpFrame, LocaleFrame, Version,
};
use crate::error::{ResourceError, ResourceResult};
use crate::name::ResourceName;
use crate::request::{CountPolicy, PatchOperation, Request, RequestBuilder, SortKey};

pub const HEADER_ACCEPT_API_VERSION: &str = "accept-api-version";
pub const HEADER_CONTENT_API_VERSION: &str = "Content-API-Version";
pub const HEADER_IF_MATCH: &str = "if-match";
pub const HEADER_IF_NONE_MATCH: &str = "if-none-match";

pub const PARAM_ACTION: &str = "_action";
pub const PARAM_FIELDS: &str = "_fields";
pub const PARAM_MIME_TYPE: &str = "_mimeType";
pub const PARAM_PAGE_SIZE: &str = "_pageSize";
pub const PARAM_PAGED_RESULTS_COOKIE: &str = "_pagedResultsCookie";
pub const PARAM_PAGED_RESULTS_OFFSET: &str = "_pagedResultsOffset";
pub const PARAM_PRETTY_PRINT: &str = "_prettyPrint";
pub const PARAM_QUERY_EXPRESSION: &str = "_queryExpression";
pub const PARAM_QUERY_FILTER: &str = "_queryFilter";
pub const PARAM_QUERY_ID: &str = "_queryId";
pub const PARAM_SORT_KEYS: &str = "_sortKeys";
pub const PARAM_TOTAL_PAGED_RESULTS_POLICY: &str = "_totalPagedResultsPolicy";

const ACTION_CREATE: &str = "create";
const ETAG_ANY: &str = "*";
const MIME_TYPE_JSON: &str = "application/json";

/// Protocol settings the adapter applies to every request.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub protocol_name: String,
    pub protocol_version: Version,
    pub restricted_advice_names: Vec<String>,
}

impl ApiSettings {
    pub fn from_config(config: &ApiConfig) -> ResourceResult<Self> {
        Ok(Self {
            protocol_name: config.protocol_name.clone(),
            protocol_version: config.protocol_version.parse()?,
            restricted_advice_names: config.restricted_advice_names.clone(),
        })
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            protocol_name: "crest".to_string(),
            protocol_version: Version::new(2, 0),
            restricted_advice_names: crate::config::schema::DEFAULT_RESTRICTED_ADVICE_NAMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// A parsed request plus rendering options taken from the query string.
#[derive(Debug, Clone)]
pub struct AdaptedRequest {
    pub request: Request,
    pub pretty_print: bool,
}

/// Query string parameters grouped by name, in order of appearance.
#[derive(Debug, Default)]
struct Params {
    entries: Vec<(String, Vec<String>)>,
}

impl Params {
    fn new(pairs: &[(String, String)]) -> Self {
        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for (name, value) in pairs {
            match entries.iter_mut().find(|(n, _)| n == name) {
                Some((_, values)) => values.push(value.clone()),
                None => entries.push((name.clone(), vec![value.clone()])),
            }
        }
        Self { entries }
    }

    fn has(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    fn single(&self, name: &str) -> ResourceResult<Option<&str>> {
        match self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            None => Ok(None),
            Some((_, values)) => single_value(name, values).map(Some),
        }
    }
}

fn single_value<'a>(name: &str, values: &'a [String]) -> ResourceResult<&'a str> {
    match values {
        [value] => Ok(value.as_str()),
        _ => Err(ResourceError::BadRequest(format!(
            "only one value may be given for parameter '{}'",
            name
        ))),
    }
}

fn parse_number(name: &str, value: &str) -> ResourceResult<u32> {
    value.parse().map_err(|_| {
        ResourceError::BadRequest(format!(
            "the value '{}' for parameter '{}' is not a non-negative integer",
            value, name
        ))
    })
}

fn parse_bool(name: &str, value: &str) -> ResourceResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "" => Ok(true),
        "false" => Ok(false),
        _ => Err(ResourceError::BadRequest(format!(
            "the value '{}' for parameter '{}' is not a boolean",
            value, name
        ))),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// An entity tag with surrounding quotes removed.
fn revision_of(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name).map(|tag| {
        let tag = tag.trim();
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        tag.trim_matches('"').to_string()
    })
}

fn json_content(body: &[u8]) -> ResourceResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ResourceError::BadRequest(
            "the request has no JSON content".to_string(),
        ));
    }
    serde_json::from_slice(body).map_err(|e| {
        ResourceError::BadRequest(format!("the request content is not valid JSON: {}", e))
    })
}

fn optional_json_content(body: &[u8]) -> ResourceResult<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        json_content(body)
    }
}

fn preprocess(method: &Method, headers: &HeaderMap) -> ResourceResult<()> {
    if *method != Method::GET {
        if let Some(content_type) = header_str(headers, header::CONTENT_TYPE.as_str()) {
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            if !essence.eq_ignore_ascii_case(MIME_TYPE_JSON) {
                return Err(ResourceError::BadRequest(format!(
                    "content type '{}' is not supported; use '{}'",
                    content_type, MIME_TYPE_JSON
                )));
            }
        }
    }
    for unsupported in [header::IF_MODIFIED_SINCE, header::IF_UNMODIFIED_SINCE] {
        if headers.contains_key(&unsupported) {
            return Err(ResourceError::Conflict(format!(
                "header {} is not supported",
                unsupported
            )));
        }
    }
    Ok(())
}

fn reject_if_none_match(method: &Method, headers: &HeaderMap) -> ResourceResult<()> {
    if headers.contains_key(HEADER_IF_NONE_MATCH) {
        return Err(ResourceError::PreconditionFailed(format!(
            "If-None-Match is not supported for {} requests",
            method
        )));
    }
    Ok(())
}

/// Apply `_fields`, `_prettyPrint` and additional parameters. `skip` names
/// protocol parameters the caller already consumed.
fn apply_common(
    mut builder: RequestBuilder,
    params: &Params,
    skip: &[&str],
) -> ResourceResult<(RequestBuilder, bool)> {
    let mut pretty_print = false;
    for (name, values) in &params.entries {
        if skip.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        if name.eq_ignore_ascii_case(PARAM_FIELDS) {
            for value in values {
                builder = builder.fields(value.split(',').map(str::trim).filter(|f| !f.is_empty()));
            }
        } else if name.eq_ignore_ascii_case(PARAM_PRETTY_PRINT) {
            pretty_print = parse_bool(name, single_value(name, values)?)?;
        } else {
            builder = builder.additional_parameter(name, single_value(name, values)?);
        }
    }
    Ok((builder, pretty_print))
}

fn finish(builder: RequestBuilder, params: &Params, skip: &[&str]) -> ResourceResult<AdaptedRequest> {
    let (builder, pretty_print) = apply_common(builder, params, skip)?;
    Ok(AdaptedRequest {
        request: builder.build()?,
        pretty_print,
    })
}

fn parse_get(name: ResourceName, params: &Params, headers: &HeaderMap) -> ResourceResult<AdaptedRequest> {
    let is_query = [PARAM_QUERY_FILTER, PARAM_QUERY_ID, PARAM_QUERY_EXPRESSION]
        .iter()
        .any(|p| params.has(p));
    if !is_query {
        if revision_of(headers, HEADER_IF_NONE_MATCH).as_deref() == Some(ETAG_ANY) {
            return Err(ResourceError::PreconditionFailed(
                "If-None-Match: * is not appropriate for GET requests".to_string(),
            ));
        }
        if params.has(PARAM_MIME_TYPE) {
            let mime_type = params.single(PARAM_MIME_TYPE)?.unwrap_or_default();
            if mime_type.contains(',') {
                return Err(ResourceError::BadRequest(
                    "only one mime type value is allowed".to_string(),
                ));
            }
        }
        return finish(Request::read(name), params, &[PARAM_MIME_TYPE]);
    }

    let mut builder = Request::query(name);
    if let Some(filter) = params.single(PARAM_QUERY_FILTER)? {
        builder = builder.query_filter(filter);
    }
    if let Some(id) = params.single(PARAM_QUERY_ID)? {
        builder = builder.query_id(id);
    }
    if let Some(expression) = params.single(PARAM_QUERY_EXPRESSION)? {
        builder = builder.query_expression(expression);
    }
    if let Some(keys) = params.single(PARAM_SORT_KEYS)? {
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            builder = builder.sort_key(key.parse::<SortKey>()?);
        }
    }
    if let Some(size) = params.single(PARAM_PAGE_SIZE)? {
        builder = builder.page_size(parse_number(PARAM_PAGE_SIZE, size)?);
    }
    if let Some(offset) = params.single(PARAM_PAGED_RESULTS_OFFSET)? {
        builder = builder.paged_results_offset(parse_number(PARAM_PAGED_RESULTS_OFFSET, offset)?);
    }
    if let Some(cookie) = params.single(PARAM_PAGED_RESULTS_COOKIE)? {
        builder = builder.paged_results_cookie(cookie);
    }
    if let Some(policy) = params.single(PARAM_TOTAL_PAGED_RESULTS_POLICY)? {
        builder = builder.total_paged_results_policy(policy.parse::<CountPolicy>()?);
    }
    finish(
        builder,
        params,
        &[
            PARAM_QUERY_FILTER,
            PARAM_QUERY_ID,
            PARAM_QUERY_EXPRESSION,
            PARAM_SORT_KEYS,
            PARAM_PAGE_SIZE,
            PARAM_PAGED_RESULTS_OFFSET,
            PARAM_PAGED_RESULTS_COOKIE,
            PARAM_TOTAL_PAGED_RESULTS_POLICY,
        ],
    )
}

fn parse_put(
    name: ResourceName,
    params: &Params,
    headers: &HeaderMap,
    body: &[u8],
) -> ResourceResult<AdaptedRequest> {
    let if_match = revision_of(headers, HEADER_IF_MATCH);
    let if_none_match = revision_of(headers, HEADER_IF_NONE_MATCH);
    if if_match.is_some() && if_none_match.is_some() {
        return Err(ResourceError::PreconditionFailed(
            "If-Match and If-None-Match cannot be combined on PUT requests".to_string(),
        ));
    }
    let content = json_content(body)?;

    match if_match {
        Some(revision) => finish(Request::update(name, content).revision(revision), params, &[]),
        None => {
            let (Some(parent), Some(id)) = (name.parent(), name.leaf()) else {
                return Err(ResourceError::BadRequest(
                    "no new resource id in PUT request".to_string(),
                ));
            };
            let builder = Request::create(parent, content).new_resource_id(id);
            finish(builder, params, &[])
        }
    }
}

fn parse_post(name: ResourceName, params: &Params, body: &[u8]) -> ResourceResult<AdaptedRequest> {
    let action = params.single(PARAM_ACTION)?.ok_or_else(|| {
        ResourceError::BadRequest(format!("POST requests need an '{}' parameter", PARAM_ACTION))
    })?;
    if action.eq_ignore_ascii_case(ACTION_CREATE) {
        finish(Request::create(name, json_content(body)?), params, &[PARAM_ACTION])
    } else {
        let builder = Request::action(name, action).content(optional_json_content(body)?);
        finish(builder, params, &[PARAM_ACTION])
    }
}

/// Turn the pieces of an HTTP request into a resource request.
pub fn parse_request(
    method: &Method,
    path: &str,
    query: &[(String, String)],
    headers: &HeaderMap,
    body: &[u8],
) -> ResourceResult<AdaptedRequest> {
    preprocess(method, headers)?;
    let name = ResourceName::parse(path)?;
    let params = Params::new(query);

    match *method {
        Method::GET => parse_get(name, &params, headers),
        Method::PUT => parse_put(name, &params, headers, body),
        Method::POST => parse_post(name, &params, body),
        Method::DELETE => {
            reject_if_none_match(method, headers)?;
            let mut builder = Request::delete(name);
            if let Some(revision) = revision_of(headers, HEADER_IF_MATCH) {
                builder = builder.revision(revision);
            }
            finish(builder, &params, &[])
        }
        Method::PATCH => {
            reject_if_none_match(method, headers)?;
            let operations = PatchOperation::list_from_json(&json_content(body)?)?;
            let mut builder = Request::patch(name, operations);
            if let Some(revision) = revision_of(headers, HEADER_IF_MATCH) {
                builder = builder.revision(revision);
            }
            finish(builder, &params, &[])
        }
        _ => Err(ResourceError::NotSupported(format!(
            "method {} is not supported",
            method
        ))),
    }
}

/// `protocol=2.0,resource=1.0`, the negotiated versions echoed to the client.
fn content_api_version(version: &ApiVersionFrame) -> String {
    match version.resource_version {
        Some(resource) => format!("protocol={},resource={}", version.protocol_version, resource),
        None => format!("protocol={}", version.protocol_version),
    }
}

/// Build the context chain for one HTTP request.
///
/// The adapter owns the advice frame on top of the chain; it is the advice
/// surfaced as response headers.
pub fn build_context(
    api: &ApiSettings,
    method: &Method,
    path: &str,
    query: &[(String, String)],
    headers: &HeaderMap,
) -> ResourceResult<Context> {
    let mut header_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            header_map
                .entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    let mut parameters: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in query {
        parameters.entry(name.clone()).or_default().push(value.clone());
    }

    let mut context = Context::root().with_http(HttpFrame {
        method: method.to_string(),
        path: path.to_string(),
        headers: header_map,
        parameters,
    });

    if let Some(languages) = header_str(headers, header::ACCEPT_LANGUAGE.as_str()) {
        context = context.with_locale(LocaleFrame::from_accept_language(languages));
    }

    let accept = match header_str(headers, HEADER_ACCEPT_API_VERSION) {
        Some(value) => AcceptApiVersion::parse(value)?,
        None => AcceptApiVersion::default(),
    };
    let version = ApiVersionFrame::negotiate(&api.protocol_name, api.protocol_version, accept)?;

    let mut advice = AdviceFrame::new(api.restricted_advice_names.iter().cloned());
    if let Err(e) = advice.put_advice(HEADER_CONTENT_API_VERSION, &content_api_version(&version)) {
        tracing::warn!(error = %e, "Not advertising the negotiated API version");
    }
    Ok(context.with_api_version(version).with_advice(advice))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestKind, RequestType};
    use axum::http::HeaderValue;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn parse(
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        hdrs: &[(&'static str, &'static str)],
        body: &str,
    ) -> ResourceResult<Request> {
        parse_request(&method, path, &params(query), &headers(hdrs), body.as_bytes())
            .map(|a| a.request)
    }

    #[test]
    fn test_get_read_and_query() {
        let read = parse(Method::GET, "/users/1", &[("_fields", "name,email")], &[], "").unwrap();
        assert_eq!(read.request_type(), RequestType::Read);
        assert_eq!(read.fields(), ["/name", "/email"]);

        let query = parse(
            Method::GET,
            "/users",
            &[("_queryFilter", "true"), ("_pageSize", "10"), ("_sortKeys", "-age,name")],
            &[],
            "",
        )
        .unwrap();
        let RequestKind::Query(q) = query.kind() else {
            panic!("expected a query");
        };
        assert_eq!(q.page_size, 10);
        assert_eq!(q.sort_keys, vec![SortKey::descending("age"), SortKey::ascending("name")]);

        assert!(parse(
            Method::GET,
            "/users",
            &[("_queryFilter", "true"), ("_queryId", "all")],
            &[],
            ""
        )
        .is_err());
        assert!(parse(Method::GET, "/users", &[("_queryFilter", "true"), ("_pageSize", "x")], &[], "").is_err());
    }

    #[test]
    fn test_unknown_reserved_parameter() {
        let err = parse(Method::GET, "/users/1", &[("_bogus", "1")], &[], "").unwrap_err();
        assert!(matches!(err, ResourceError::BadRequest(_)));
        let ok = parse(Method::GET, "/users/1", &[("tenant", "eu")], &[], "").unwrap();
        assert_eq!(ok.additional_parameter("tenant"), Some("eu"));
    }

    #[test]
    fn test_put_create_and_update() {
        let create = parse(Method::PUT, "/users/bjensen", &[], &[], r#"{"a":1}"#).unwrap();
        match create.kind() {
            RequestKind::Create { new_resource_id, .. } => {
                assert_eq!(new_resource_id.as_deref(), Some("bjensen"))
            }
            other => panic!("expected create, got {:?}", other),
        }
        assert_eq!(create.resource_name().to_string(), "users");

        let update = parse(Method::PUT, "/users/bjensen", &[], &[("if-match", "\"3\"")], "{}").unwrap();
        assert_eq!(update.request_type(), RequestType::Update);
        assert_eq!(update.revision(), Some("3"));

        let forced = parse(Method::PUT, "/users/x", &[], &[("if-none-match", "*")], "{}").unwrap();
        assert_eq!(forced.request_type(), RequestType::Create);

        assert!(matches!(
            parse(Method::PUT, "/", &[], &[], "{}"),
            Err(ResourceError::BadRequest(_))
        ));
        assert!(matches!(
            parse(
                Method::PUT,
                "/users/x",
                &[],
                &[("if-match", "1"), ("if-none-match", "*")],
                "{}"
            ),
            Err(ResourceError::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_post() {
        let create = parse(Method::POST, "/users", &[("_action", "create")], &[], "{}").unwrap();
        assert_eq!(create.request_type(), RequestType::Create);

        let action = parse(
            Method::POST,
            "/users",
            &[("_action", "reset"), ("_tenant", "eu")],
            &[],
            "",
        )
        .unwrap();
        match action.kind() {
            RequestKind::Action { action, content } => {
                assert_eq!(action, "reset");
                assert_eq!(content, &Value::Null);
            }
            other => panic!("expected action, got {:?}", other),
        }
        assert_eq!(action.additional_parameter("_tenant"), Some("eu"));

        assert!(parse(Method::POST, "/users", &[], &[], "{}").is_err());
    }

    #[test]
    fn test_delete_and_patch() {
        let delete = parse(Method::DELETE, "/users/1", &[], &[("if-match", "2")], "").unwrap();
        assert_eq!(delete.revision(), Some("2"));
        assert!(parse(Method::DELETE, "/users/1", &[], &[("if-none-match", "2")], "").is_err());

        let patch = parse(
            Method::PATCH,
            "/users/1",
            &[],
            &[],
            r#"[{"operation":"replace","field":"/a","value":1}]"#,
        )
        .unwrap();
        assert_eq!(patch.request_type(), RequestType::Patch);
        assert!(parse(Method::PATCH, "/users/1", &[], &[], "{}").is_err());
    }

    #[test]
    fn test_preprocess() {
        assert!(matches!(
            parse(Method::POST, "/users", &[("_action", "x")], &[("content-type", "text/plain")], ""),
            Err(ResourceError::BadRequest(_))
        ));
        assert!(parse(
            Method::POST,
            "/users",
            &[("_action", "x")],
            &[("content-type", "application/json; charset=UTF-8")],
            ""
        )
        .is_ok());
        assert!(matches!(
            parse(Method::GET, "/users/1", &[], &[("if-modified-since", "yesterday")], ""),
            Err(ResourceError::Conflict(_))
        ));
        assert!(matches!(
            parse(Method::GET, "/a//b", &[], &[], ""),
            Err(ResourceError::MalformedName(_))
        ));
        assert!(matches!(
            parse(Method::HEAD, "/users", &[], &[], ""),
            Err(ResourceError::NotSupported(_))
        ));
    }

    #[test]
    fn test_context_chain() {
        let ctx = build_context(
            &ApiSettings::default(),
            &Method::GET,
            "/users/1",
            &params(&[("_fields", "a")]),
            &headers(&[("accept-api-version", "protocol=2.0,resource=1.0")]),
        )
        .unwrap();

        let kinds: Vec<&str> = ctx.ancestors().map(Context::kind).collect();
        assert_eq!(kinds, vec!["advice", "apiVersion", "http", "root"]);
        assert!(ctx.is_external());
        assert_eq!(
            ctx.get::<ApiVersionFrame>().unwrap().resource_version,
            Some(Version::new(1, 0))
        );
        assert_eq!(ctx.get::<HttpFrame>().unwrap().parameter("_fields"), Some("a"));
        assert_eq!(
            ctx.get::<AdviceFrame>().unwrap().advices()[HEADER_CONTENT_API_VERSION],
            vec!["protocol=2.0,resource=1.0"]
        );
        assert!(ctx.put_advice("Content-Type", "x").is_err());
        assert!(ctx.put_advice("X-Warning", "x").is_ok());
        assert!(ctx.internal().put_advice("X-Warning", "y").is_err());

        let err = build_context(
            &ApiSettings::default(),
            &Method::GET,
            "/",
            &[],
            &headers(&[("accept-api-version", "protocol=3.0")]),
        );
        assert!(matches!(err, Err(ResourceError::BadRequest(_))));
    }

    #[test]
    fn test_locale_frame_from_header() {
        let ctx = build_context(
            &ApiSettings::default(),
            &Method::GET,
            "/",
            &[],
            &headers(&[("accept-language", "fr-CA, en;q=0.5")]),
        )
        .unwrap();
        assert_eq!(
            ctx.get::<LocaleFrame>().unwrap().preferred_locales,
            vec!["fr-CA", "en"]
        );
    }
}
