//! Runs a handful of requests through a typical edge middleware table and prints the
//! outcome of each.
//!
//! ```text
//! RUST_LOG=pathchain=trace cargo run --example edge_middleware
//! ```

use std::time::Duration;

use pathchain::http::{Cookie, SameSite};
use pathchain::middleware::{Flow, Handler, from_async_fn, from_fn, short_circuit};
use pathchain::security::Cors;
use pathchain::{Dispatcher, Event, Method, Request, Response, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathchain=debug,edge_middleware=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dispatcher = Dispatcher::builder()
        // Static assets skip everything else.
        .route("/_next/*asset", short_circuit())
        .route(
            "{/*any}",
            from_fn(|ctx| {
                ctx.response.headers_mut().set("x-frame-options", "DENY");
                if ctx.request.cookie("visitor").is_none() {
                    ctx.response.cookies_mut().set(
                        Cookie::new("visitor", "anonymous")
                            .path("/")
                            .http_only(true)
                            .same_site(SameSite::Lax),
                    );
                }
                Ok(Flow::Continue)
            }),
        )
        .route(
            "/api/*rest",
            vec![
                Cors::new().allow_origin("https://app.example.com").boxed(),
                from_async_fn(|ctx| {
                    Box::pin(async move {
                        let path = ctx.request.path().to_owned();
                        ctx.event.wait_until(async move {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            tracing::info!(%path, "analytics flushed");
                        });
                        Ok(Flow::Continue)
                    })
                })
                .boxed(),
            ],
        )
        .route(
            "/dashboard{/*section}",
            from_fn(|ctx| {
                if ctx.request.cookie("session").is_some() {
                    return Ok(Flow::Continue);
                }
                let target = format!("/login?from={}", ctx.request.path());
                Ok(Flow::Terminate(Response::redirect(target, StatusCode::TemporaryRedirect)))
            }),
        )
        .route(
            "/api/users/:id",
            from_fn(|ctx| {
                let id = ctx.param("id").unwrap_or_default();
                Ok(Flow::Terminate(Response::json(&serde_json::json!({ "id": id }))?))
            }),
        )
        .build()?;

    tracing::info!(routes = dispatcher.len(), "dispatcher ready");

    let requests = [
        Request::get("https://shop.example.com/_next/static/app.js")?,
        Request::get("https://shop.example.com/")?,
        Request::get("https://shop.example.com/dashboard/orders")?,
        Request::get("https://shop.example.com/dashboard")?.header("Cookie", "session=abc; visitor=v1"),
        Request::get("https://shop.example.com/api/users/7")?
            .header("Origin", "https://app.example.com"),
        Request::new(Method::Options, "https://shop.example.com/api/users/7")?
            .header("Origin", "https://app.example.com"),
    ];

    for request in &requests {
        let event = Event::new().with_source_page(request.path());
        let response = dispatcher.dispatch(request, &event).await?;
        event.settle().await;

        println!("{} {}", request.method(), request.path());
        println!("  status: {}", response.status());
        println!("  next:   {}", response.is_next());
        for (name, value) in response.headers().iter() {
            println!("  {name}: {value}");
        }
        for cookie in response.set_cookie_values() {
            println!("  set-cookie: {cookie}");
        }
        if !response.body_bytes().is_empty() {
            println!("  body:   {}", response.text()?);
        }
    }

    Ok(())
}
