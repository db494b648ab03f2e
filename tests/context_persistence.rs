//! Saving and restoring context chains.

use std::collections::BTreeMap;

use serde_json::json;

use resource_router::context::{
    AcceptApiVersion, AdviceFrame, ApiVersionFrame, Context, CustomFrame, HttpFrame, KindRegistry,
    LocaleFrame, RouterFrame, SecurityFrame, Version,
};
use resource_router::ResourceError;

fn full_chain() -> Context {
    let mut headers = BTreeMap::new();
    headers.insert("accept".to_string(), vec!["application/json".to_string()]);
    let mut parameters = BTreeMap::new();
    parameters.insert("_fields".to_string(), vec!["a".to_string(), "b".to_string()]);

    let version = ApiVersionFrame::negotiate(
        "crest",
        Version::new(2, 1),
        AcceptApiVersion::parse("protocol=2.0,resource=1.3").unwrap(),
    )
    .unwrap();

    let mut variables = BTreeMap::new();
    variables.insert("tenant".to_string(), "acme".to_string());

    let mut advice = AdviceFrame::new(["Content-Type"]);
    advice.put_advices("X-Warning", ["deprecated", "slow"]).unwrap();

    Context::root()
        .with_http(HttpFrame {
            method: "GET".into(),
            path: "/tenants/acme/users".into(),
            headers,
            parameters,
        })
        .with_locale(LocaleFrame::new(["fr-CA", "en"]))
        .with_api_version(version)
        .with_advice(advice)
        .with_security(
            SecurityFrame::new("bjensen").with_authorization("roles", json!(["admin"])),
        )
        .with_router(RouterFrame {
            matched_uri: "tenants/acme".into(),
            remaining_uri: "users".into(),
            uri_template_variables: variables,
        })
        .with_custom(CustomFrame::new("audit", json!({"trail": [1, 2, 3]})))
        .internal()
}

fn registry() -> KindRegistry {
    let mut registry = KindRegistry::builtin();
    registry.register_custom("audit");
    registry
}

#[test]
fn test_round_trip_preserves_every_frame() {
    let ctx = full_chain();
    let restored = Context::from_json(&ctx.to_json(), &registry()).unwrap();

    let ids = |c: &Context| c.ancestors().map(|f| f.id().to_string()).collect::<Vec<_>>();
    let kinds = |c: &Context| c.ancestors().map(|f| f.kind().to_string()).collect::<Vec<_>>();
    assert_eq!(ids(&restored), ids(&ctx));
    assert_eq!(kinds(&restored), kinds(&ctx));

    assert_eq!(restored.get::<HttpFrame>().unwrap(), ctx.get::<HttpFrame>().unwrap());
    assert_eq!(restored.get::<LocaleFrame>().unwrap(), ctx.get::<LocaleFrame>().unwrap());
    assert_eq!(
        restored.get::<ApiVersionFrame>().unwrap(),
        ctx.get::<ApiVersionFrame>().unwrap()
    );
    assert_eq!(
        restored.get::<SecurityFrame>().unwrap(),
        ctx.get::<SecurityFrame>().unwrap()
    );
    assert_eq!(restored.get::<RouterFrame>().unwrap(), ctx.get::<RouterFrame>().unwrap());
    assert_eq!(restored.custom("audit").unwrap(), ctx.custom("audit").unwrap());

    let advice = restored.get::<AdviceFrame>().unwrap();
    assert_eq!(advice.advices(), ctx.get::<AdviceFrame>().unwrap().advices());
    assert_eq!(advice.advices()["X-Warning"], vec!["deprecated", "slow"]);
    assert!(advice.is_restricted("content-type"));

    assert!(!restored.is_external());
    assert_eq!(restored.template_variable("tenant"), Some("acme"));
}

#[test]
fn test_restored_chain_is_independent() {
    let ctx = full_chain();
    let restored = Context::from_json(&ctx.to_json(), &registry()).unwrap();

    assert!(restored.put_advice("X-Restored", "no").is_err());
    restored
        .as_context("advice")
        .unwrap()
        .put_advice("X-Restored", "yes")
        .unwrap();
    assert_eq!(
        restored.get::<AdviceFrame>().unwrap().advices()["X-Restored"],
        vec!["yes"]
    );
    assert!(ctx
        .get::<AdviceFrame>()
        .unwrap()
        .advices()
        .get("X-Restored")
        .is_none());
}

#[test]
fn test_unregistered_custom_kind_fails() {
    let saved = full_chain().to_json();
    let err = Context::from_json(&saved, &KindRegistry::builtin()).unwrap_err();
    assert!(matches!(err, ResourceError::ContextRestore(_)));
}

#[test]
fn test_restored_json_is_stable() {
    let ctx = full_chain();
    let saved = ctx.to_json();
    let again = Context::from_json(&saved, &registry()).unwrap().to_json();
    assert_eq!(saved, again);
}
