//! Startup through the facade: environment-loaded config, `bootstrap`, then
//! pipelines built from that config.
//!
//! `bootstrap` installs process-wide state, so this binary holds one test.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use serde_json::{json, Value};
use sieve::middleware::stages::error_formatting;
use sieve::prelude::*;

fn post(body: &Value) -> Request {
    http::Request::builder()
        .method("POST")
        .uri("/posts")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_production_flag_reaches_installed_formatter() {
    std::env::set_var("SIEVE_ENV", "production");
    std::env::set_var("SIEVE__LOGGING__ENABLED", "false");
    std::env::set_var("SIEVE__METRICS__ENABLED", "false");
    std::env::set_var("SIEVE__RESOLUTION__LOOKUP_TIMEOUT_MS", "500");

    let config = ConfigLoader::new().with_env_prefix("SIEVE").load().unwrap();
    assert!(config.environment.is_production());
    assert!(!config.expose_stack());

    sieve::bootstrap(&config).unwrap();
    assert!(!error_formatting::installed().expose_stack());
    assert_eq!(ErrorFormatter::from_env(), error_formatting::installed());

    let users = ResolverMap::new().with_fn("author", |id: Value| async move {
        Ok::<_, LookupError>(json!({ "id": id, "name": "Ann" }))
    });
    let pipeline = Pipeline::builder()
        .resolve(sieve::resolution(users, &config))
        .validate(sieve::validation(
            Schema::object(vec![
                ("title", Schema::string().min_length(1).required()),
                ("author", Schema::open_object().required()),
            ]),
            &config,
        ))
        .build();
    assert!(!pipeline.formatter().expose_stack());

    let response = pipeline
        .process(post(&json!({ "title": "Dune", "author": "u1" })), |ctx, _req| {
            let post = ctx.body().clone();
            Box::pin(async move { Ok(Response::json(StatusCode::CREATED, &post)) })
        })
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        json_body(response).await,
        json!({ "title": "Dune", "author": { "id": "u1", "name": "Ann" } })
    );

    let response = pipeline
        .process(post(&json!({ "title": "Dune", "author": "u1" })), |_ctx, _req| {
            Box::pin(async { Err(SieveError::internal("db down")) })
        })
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["name"], "InternalServerError");
    assert!(body.get("stack").is_none());
}
