//! Routes a few in-process requests through adapted callbacks and prints the responses.
//!
//! run with `cargo run --example kitchen_sink`

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{Method, Request};
use http_body_util::Full;
use micro_bind::{Adapter, Bind, BoxError, Fields, HttpError, Json, PathParams, RequestContext, RequestHandler, UploadedFile};
use serde::{Deserialize, Serialize};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Default, Deserialize)]
struct Profile {
    name: String,
    email: String,
}

micro_bind::record_types!(Profile);

#[derive(Debug, Default)]
struct UpdateProfile {
    id: u64,
    profile: Profile,
    token: String,
    notify: bool,
    session: String,
}

impl Bind for UpdateProfile {
    fn bindings(fields: &mut Fields<Self>) {
        fields
            .field("id", "path:id", |input| &mut input.id)
            .field("profile", "body", |input| &mut input.profile)
            .field("token", "header:Authorization", |input| &mut input.token)
            .field("notify", "query:notify", |input| &mut input.notify)
            .field("session", "cookie:session", |input| &mut input.session);
    }
}

#[derive(Debug, Serialize)]
struct Updated {
    id: u64,
    name: String,
    email: String,
    notified: bool,
}

async fn update_profile(input: UpdateProfile) -> Result<Updated, HttpError> {
    if input.token != "Bearer secret" {
        return Err(HttpError::unauthorized("invalid token"));
    }
    info!(session = %input.session, "updating profile");
    Ok(Updated { id: input.id, name: input.profile.name, email: input.profile.email, notified: input.notify })
}

#[derive(Debug, Default)]
struct Avatar {
    id: u64,
    caption: String,
    image: UploadedFile,
}

impl Bind for Avatar {
    fn bindings(fields: &mut Fields<Self>) {
        fields
            .field("id", "path:id", |input| &mut input.id)
            .field("caption", "form:caption", |input| &mut input.caption)
            .field("image", "file:image", |input| &mut input.image);
    }
}

#[derive(Debug, Serialize)]
struct Stored {
    id: u64,
    caption: String,
    file_name: Option<String>,
    size: u64,
}

async fn upload_avatar(input: Avatar) -> Result<Stored, BoxError> {
    let content = input.image.bytes().await?;
    info!(bytes = content.len(), "storing avatar");
    Ok(Stored {
        id: input.id,
        caption: input.caption,
        file_name: input.image.file_name().map(ToOwned::to_owned),
        size: input.image.size(),
    })
}

#[derive(Debug, Default)]
struct Ping {
    echo: String,
}

impl Bind for Ping {
    fn bindings(fields: &mut Fields<Self>) {
        fields.field("echo", "query:echo", |input| &mut input.echo);
    }
}

async fn ping(input: Ping) -> Json<String> {
    Json(input.echo)
}

fn route(
    routes: &mut matchit::Router<Box<dyn RequestHandler>>,
    path: &str,
    handler: impl RequestHandler + 'static,
) -> Result<(), BoxError> {
    routes.insert(path, Box::new(handler))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut routes = matchit::Router::new();
    route(&mut routes, "/users/{id}", Adapter::new(update_profile)?)?;
    route(&mut routes, "/users/{id}/avatar", Adapter::builder().max_memory(1 << 20).build(upload_avatar)?)?;
    route(&mut routes, "/ping", Adapter::new(ping)?)?;

    let boundary = "kitchen-sink";
    let multipart = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nat the beach\r\n\
         --{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNG...\r\n--{boundary}--\r\n"
    );

    let requests = vec![
        Request::builder()
            .method(Method::PUT)
            .uri("/users/7?notify=true")
            .header(AUTHORIZATION, "Bearer secret")
            .header(COOKIE, "session=abc")
            .body(Full::new(Bytes::from_static(br#"{"name":"Ann","email":"ann@example.com"}"#)))?,
        Request::builder()
            .method(Method::PUT)
            .uri("/users/7")
            .header(COOKIE, "session=abc")
            .body(Full::new(Bytes::from_static(br#"{"name":"Ann","email":"ann@example.com"}"#)))?,
        Request::builder()
            .method(Method::PUT)
            .uri("/users/7")
            .header(AUTHORIZATION, "Bearer secret")
            .body(Full::new(Bytes::from_static(br#"{"name":"Ann","email":"ann@example.com"}"#)))?,
        Request::builder()
            .method(Method::POST)
            .uri("/users/7/avatar")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Full::new(Bytes::from(multipart)))?,
        Request::builder().uri("/ping?echo=pong").body(Full::new(Bytes::new()))?,
    ];

    for request in requests {
        let path = request.uri().path().to_owned();
        let matched = routes.at(&path)?;
        let path_params = PathParams::from(matched.params);

        let ctx = RequestContext::from_request(request, path_params);
        let response = matched.value.invoke(ctx).await;

        info!(
            path = %path,
            status = %response.status(),
            body = %String::from_utf8_lossy(response.body().as_bytes()),
            "handled request"
        );
    }

    Ok(())
}
