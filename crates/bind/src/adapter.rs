//! Adapts a typed callback into a request handler.
//!
//! The callback is analyzed and its input type compiled into a binding plan once, when the
//! adapter is built. Every request then runs the same pipeline:
//!
//! 1. start from the zero-valued input
//! 2. resolve the body field first, then the other fields in declaration order
//! 3. invoke the callback with the bound input
//! 4. turn the outcome into a response
//!
//! A failing step skips the rest: a binding failure answers `400 Bad Request` without calling
//! the callback.

use crate::analyzer::{Callback, CallbackDescriptor, Inputs, analyze};
use crate::body::ResponseBody;
use crate::compiler::{Plan, compile};
use crate::error::{BoxError, CompileError};
use crate::fields::Record;
use crate::handler::RequestHandler;
use crate::reply::Reply;
use crate::request::{PathParams, RequestContext};
use crate::responder::{Responder, error_response};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body::Body as HttpBody;
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, error};

/// The memory threshold for form decoding when none is configured: 32 MiB.
pub const DEFAULT_MAX_MEMORY: u64 = 32 << 20;

/// Options applied when an adapter is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptOptions {
    max_memory: u64,
}

impl Default for AdaptOptions {
    fn default() -> Self {
        Self { max_memory: DEFAULT_MAX_MEMORY }
    }
}

impl AdaptOptions {
    /// How many bytes of a form payload are held in memory. Multipart file parts beyond it are
    /// written to temporary files, text values beyond it are rejected.
    pub fn max_memory(&self) -> u64 {
        self.max_memory
    }
}

#[derive(Debug, Default)]
pub struct AdapterBuilder {
    options: AdaptOptions,
}

impl AdapterBuilder {
    fn new() -> Self {
        Self { options: AdaptOptions::default() }
    }

    /// Sets the form memory threshold in bytes; `0` restores the default.
    pub fn max_memory(mut self, max_memory: u64) -> Self {
        self.options.max_memory = if max_memory == 0 { DEFAULT_MAX_MEMORY } else { max_memory };
        self
    }

    pub fn build<F, Args>(self, callback: F) -> Result<Adapter<F, Args>, CompileError>
    where
        F: Callback<Args>,
        Args: Inputs,
    {
        let descriptor = analyze(&callback);
        if descriptor.num_inputs() != 1 {
            return Err(CompileError::InvalidHandlerShape { inputs: descriptor.num_inputs() });
        }
        let record = Args::record().ok_or(CompileError::InvalidHandlerShape { inputs: descriptor.num_inputs() })?;
        let plan = compile(&record, &self.options)?;

        debug!(
            callback = type_name::<F>(),
            input = record.type_name(),
            outputs = ?descriptor.output_types(),
            returns_error = descriptor.returns_error(),
            "adapted callback"
        );

        Ok(Adapter { callback, descriptor, options: self.options, record, plan, _phantom: PhantomData })
    }
}

/// A callback bound to the request fields its input type declares.
///
/// Immutable once built; one adapter serves any number of concurrent requests.
pub struct Adapter<F, Args> {
    callback: F,
    descriptor: CallbackDescriptor,
    options: AdaptOptions,
    record: Record,
    plan: Plan,
    _phantom: PhantomData<fn(Args)>,
}

impl<F, Args> fmt::Debug for Adapter<F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("callback", &type_name::<F>())
            .field("descriptor", &self.descriptor)
            .field("options", &self.options)
            .field("record", &self.record)
            .field("resolvers", &self.plan.len())
            .finish()
    }
}

impl Adapter<(), ()> {
    pub fn builder() -> AdapterBuilder {
        AdapterBuilder::new()
    }
}

impl<F, Args> Adapter<F, Args>
where
    F: Callback<Args>,
    Args: Inputs,
{
    /// Adapts `callback` with the default options.
    pub fn new(callback: F) -> Result<Self, CompileError> {
        AdapterBuilder::new().build(callback)
    }

    pub fn descriptor(&self) -> &CallbackDescriptor {
        &self.descriptor
    }

    pub fn options(&self) -> &AdaptOptions {
        &self.options
    }

    /// Binds `request`, invokes the callback and produces the response.
    pub async fn handle<B>(&self, request: Request<B>, path_params: PathParams) -> Response<ResponseBody>
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.dispatch(RequestContext::from_request(request, path_params)).await
    }

    async fn dispatch(&self, mut ctx: RequestContext) -> Response<ResponseBody> {
        let mut instance = self.record.new_instance();
        if let Err(e) = self.plan.bind(&self.record, &mut *instance, &mut ctx).await {
            debug!(input = self.record.type_name(), method = %ctx.method(), uri = %ctx.uri(), cause = %e, "failed to bind request");
            return e.response_to();
        }

        let Some(args) = Args::from_instance(instance) else {
            error!(input = self.record.type_name(), "bound instance does not match the callback input");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "bound input does not match the callback");
        };

        self.callback.call(args).await.into_outcome().response_to()
    }
}

#[async_trait]
impl<F, Args> RequestHandler for Adapter<F, Args>
where
    F: Callback<Args>,
    Args: Inputs,
{
    async fn invoke(&self, ctx: RequestContext) -> Response<ResponseBody> {
        self.dispatch(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::fields::{Bind, Fields};
    use crate::form::UploadedFile;
    use crate::form::tests::{Part, multipart_body, multipart_content_type};
    use crate::reply::Json;
    use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
    use http_body_util::{Empty, Full};
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn json_of(response: &Response<ResponseBody>) -> Value {
        serde_json::from_slice(response.body().as_bytes()).unwrap()
    }

    fn empty_get(uri: &str) -> Request<Empty<Bytes>> {
        Request::get(uri).body(Empty::new()).unwrap()
    }

    #[derive(Debug, Default, Deserialize)]
    struct NewUser {
        name: String,
        age: u8,
    }

    crate::record_types!(NewUser);

    #[derive(Debug, Default)]
    struct CreateUser {
        user: NewUser,
        token: String,
        dry_run: bool,
        session: String,
    }

    impl Bind for CreateUser {
        fn bindings(fields: &mut Fields<Self>) {
            fields
                .field("user", "body", |input| &mut input.user)
                .field("token", "header:Authorization", |input| &mut input.token)
                .field("dry_run", "query:dry_run", |input| &mut input.dry_run)
                .field("session", "cookie:session", |input| &mut input.session);
        }
    }

    #[derive(Serialize)]
    struct Created {
        name: String,
        age: u8,
        token: String,
        dry_run: bool,
        session: String,
    }

    async fn create_user(input: CreateUser) -> Json<Created> {
        Json(Created {
            name: input.user.name,
            age: input.user.age,
            token: input.token,
            dry_run: input.dry_run,
            session: input.session,
        })
    }

    #[tokio::test]
    async fn binds_body_header_query_and_cookie() {
        let adapter = Adapter::new(create_user).unwrap();
        let request = Request::post("/users?dry_run=true")
            .header(AUTHORIZATION, "Bearer abc")
            .header(COOKIE, "theme=dark; session=s-1")
            .body(Full::new(Bytes::from_static(br#"{"name":"john","age":30}"#)))
            .unwrap();

        let response = adapter.handle(request, PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(
            json_of(&response),
            json!({"name": "john", "age": 30, "token": "Bearer abc", "dry_run": true, "session": "s-1"})
        );
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let adapter = Adapter::new(create_user).unwrap();
        let request = Request::post("/users")
            .header(COOKIE, "session=s-1")
            .body(Full::new(Bytes::from_static(b"{not json")))
            .unwrap();

        let response = adapter.handle(request, PathParams::empty()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_of(&response)["error"].as_str().unwrap().starts_with("decode body"));
    }

    #[derive(Debug, Default)]
    struct Lookup {
        token: String,
        page: u32,
    }

    impl Bind for Lookup {
        fn bindings(fields: &mut Fields<Self>) {
            fields
                .field("token", "header:X-Token", |input| &mut input.token)
                .field("page", "query:page", |input| &mut input.page);
        }
    }

    #[tokio::test]
    async fn plain_callback_error_is_internal_server_error() {
        async fn fail(_input: Lookup) -> Result<u32, BoxError> {
            Err("boom".into())
        }

        let adapter = Adapter::new(fail).unwrap();
        let response = adapter.handle(empty_get("/"), PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_of(&response), json!({"error": "boom"}));
    }

    #[tokio::test]
    async fn http_error_sets_the_status() {
        async fn find(input: Lookup) -> Result<u32, HttpError> {
            Err(HttpError::not_found(format!("page {} not found", input.page)))
        }

        let adapter = Adapter::new(find).unwrap();
        let response = adapter.handle(empty_get("/?page=9"), PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_of(&response), json!({"error": "page 9 not found"}));
    }

    #[tokio::test]
    async fn missing_header_and_query_bind_zero_values() {
        async fn echo(input: Lookup) -> Result<Value, HttpError> {
            Ok(json!({"token": input.token, "page": input.page}))
        }

        let adapter = Adapter::new(echo).unwrap();
        let response = adapter.handle(empty_get("/"), PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(&response), json!({"token": "", "page": 0}));
    }

    #[tokio::test]
    async fn callback_without_output_is_no_content() {
        async fn ignore(_input: Lookup) {}
        async fn succeed(_input: Lookup) -> Result<(), HttpError> {
            Ok(())
        }

        let response = Adapter::new(ignore).unwrap().handle(empty_get("/"), PathParams::empty()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().as_bytes().is_empty());

        let response = Adapter::new(succeed).unwrap().handle(empty_get("/"), PathParams::empty()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[derive(Debug, Default)]
    struct UserId {
        id: u64,
    }

    impl Bind for UserId {
        fn bindings(fields: &mut Fields<Self>) {
            fields.field("id", "path:id", |input| &mut input.id);
        }
    }

    #[tokio::test]
    async fn failed_binding_skips_the_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let adapter = Adapter::new(move |input: UserId| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(input.id)
            }
        })
        .unwrap();

        let response = adapter.handle(empty_get("/users/42"), PathParams::empty()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = adapter.handle(empty_get("/users/42"), PathParams::from_iter([("id", "42")])).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(&response), json!(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Debug, Default)]
    struct Visit {
        id: u64,
        tab: String,
        session: String,
    }

    impl Bind for Visit {
        fn bindings(fields: &mut Fields<Self>) {
            fields
                .field("id", "path:id", |input| &mut input.id)
                .field("tab", "query:tab", |input| &mut input.tab)
                .field("session", "cookie:session", |input| &mut input.session);
        }
    }

    async fn echo_visit(input: Visit) -> Result<Value, BoxError> {
        tokio::task::yield_now().await;
        Ok(json!({"id": input.id, "tab": input.tab, "session": input.session}))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn one_adapter_serves_concurrent_requests() {
        let adapter = Arc::new(Adapter::new(echo_visit).unwrap());

        let tasks = (0..32_u64)
            .map(|i| {
                let adapter = Arc::clone(&adapter);
                tokio::spawn(async move {
                    let request = Request::get(format!("/users/{i}?tab=tab-{i}"))
                        .header(COOKIE, format!("session=s-{i}"))
                        .body(Empty::<Bytes>::new())
                        .unwrap();
                    let id = i.to_string();
                    let response = adapter.handle(request, PathParams::from_iter([("id", id.as_str())])).await;
                    (i, response)
                })
            })
            .collect::<Vec<_>>();

        for task in tasks {
            let (i, response) = task.await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(json_of(&response), json!({"id": i, "tab": format!("tab-{i}"), "session": format!("s-{i}")}));
        }
    }

    #[derive(Debug, Default)]
    struct Session {
        session: String,
    }

    impl Bind for Session {
        fn bindings(fields: &mut Fields<Self>) {
            fields.field("session", "cookie:session", |input| &mut input.session);
        }
    }

    #[tokio::test]
    async fn missing_cookie_is_bad_request() {
        async fn whoami(input: Session) -> Json<String> {
            Json(input.session)
        }

        let adapter = Adapter::new(whoami).unwrap();

        let response = adapter.handle(empty_get("/me"), PathParams::empty()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&response), json!({"error": "resolve cookie \"session\": named cookie not present"}));

        let request = Request::get("/me").header(COOKIE, "session=\"s-2\"").body(Empty::<Bytes>::new()).unwrap();
        let response = adapter.handle(request, PathParams::empty()).await;
        assert_eq!(json_of(&response), json!("s-2"));
    }

    #[derive(Debug, Default)]
    struct NewNote {
        title: String,
        pinned: bool,
        author: String,
        page: u32,
    }

    impl Bind for NewNote {
        fn bindings(fields: &mut Fields<Self>) {
            fields
                .field("title", "form:title", |input| &mut input.title)
                .field("pinned", "form:pinned", |input| &mut input.pinned)
                .field("author", "header:X-Author", |input| &mut input.author)
                .field("page", "query:page", |input| &mut input.page);
        }
    }

    #[tokio::test]
    async fn form_header_and_query_together() {
        async fn create_note(input: NewNote) -> Result<Value, BoxError> {
            Ok(json!({"title": input.title, "pinned": input.pinned, "author": input.author, "page": input.page}))
        }

        let adapter = Adapter::new(create_note).unwrap();
        let request = Request::post("/notes?page=3&title=ignored")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("X-Author", "ann")
            .body(Full::new(Bytes::from_static(b"title=groceries&pinned=1")))
            .unwrap();

        let response = adapter.handle(request, PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_of(&response), json!({"title": "groceries", "pinned": true, "author": "ann", "page": 3}));
    }

    #[derive(Debug, Default)]
    struct Upload {
        title: String,
        attachment: UploadedFile,
    }

    impl Bind for Upload {
        fn bindings(fields: &mut Fields<Self>) {
            fields
                .field("title", "form:title", |input| &mut input.title)
                .field("attachment", "file:attachment", |input| &mut input.attachment);
        }
    }

    async fn describe_upload(input: Upload) -> Result<Value, BoxError> {
        let content = input.attachment.bytes().await?;
        Ok(json!({
            "title": input.title,
            "file_name": input.attachment.file_name(),
            "content_type": input.attachment.content_type().map(ToString::to_string),
            "size": input.attachment.size(),
            "in_memory": input.attachment.is_in_memory(),
            "content_len": content.len(),
        }))
    }

    fn upload_request(parts: &[Part<'_>]) -> Request<Full<Bytes>> {
        Request::post("/uploads")
            .header(CONTENT_TYPE, multipart_content_type())
            .body(Full::new(Bytes::from(multipart_body(parts))))
            .unwrap()
    }

    #[tokio::test]
    async fn form_and_file_from_one_multipart_request() {
        let adapter = Adapter::new(describe_upload).unwrap();
        let request = upload_request(&[
            Part::Text { name: "title", value: "invoice" },
            Part::File { name: "attachment", file_name: "inv.txt", content_type: "text/plain", content: b"total: 10" },
        ]);

        let response = adapter.handle(request, PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_of(&response),
            json!({
                "title": "invoice",
                "file_name": "inv.txt",
                "content_type": "text/plain",
                "size": 9,
                "in_memory": true,
                "content_len": 9,
            })
        );
    }

    #[tokio::test]
    async fn large_upload_spills_to_disk() {
        let adapter = Adapter::builder().max_memory(16).build(describe_upload).unwrap();
        assert_eq!(adapter.options().max_memory(), 16);

        let content = vec![b'x'; 1000];
        let request = upload_request(&[
            Part::Text { name: "title", value: "big" },
            Part::File { name: "attachment", file_name: "big.bin", content_type: "application/octet-stream", content: &content },
        ]);

        let response = adapter.handle(request, PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_of(&response);
        assert_eq!(body["in_memory"], json!(false));
        assert_eq!(body["size"], json!(1000));
        assert_eq!(body["content_len"], json!(1000));
    }

    #[tokio::test]
    async fn missing_file_part_is_bad_request() {
        let adapter = Adapter::new(describe_upload).unwrap();
        let request = upload_request(&[Part::Text { name: "title", value: "no file" }]);

        let response = adapter.handle(request, PathParams::empty()).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_of(&response), json!({"error": "resolve file \"attachment\": file not found"}));
    }

    #[test]
    fn zero_max_memory_means_default() {
        async fn ignore(_input: Lookup) {}

        let adapter = Adapter::builder().max_memory(0).build(ignore).unwrap();
        assert_eq!(adapter.options().max_memory(), DEFAULT_MAX_MEMORY);
        assert_eq!(Adapter::new(ignore).unwrap().options(), &AdaptOptions::default());
    }

    #[test]
    fn descriptor_is_exposed() {
        let adapter = Adapter::new(create_user).unwrap();
        assert_eq!(adapter.descriptor().num_inputs(), 1);
        assert_eq!(adapter.descriptor().num_outputs(), 1);
        assert!(!adapter.descriptor().returns_error());
    }

    #[test]
    fn only_single_input_callbacks_are_adapted() {
        let no_inputs = Adapter::new(|| async {});
        assert!(matches!(no_inputs, Err(CompileError::InvalidHandlerShape { inputs: 0 })));

        let two_inputs = Adapter::new(|_a: Lookup, _b: Session| async {});
        assert!(matches!(two_inputs, Err(CompileError::InvalidHandlerShape { inputs: 2 })));
    }

    #[test]
    fn payload_conflicts_prevent_construction() {
        #[derive(Debug, Default)]
        struct BodyAndForm {
            user: NewUser,
            title: String,
        }

        impl Bind for BodyAndForm {
            fn bindings(fields: &mut Fields<Self>) {
                fields.field("user", "body", |input| &mut input.user).field("title", "form:title", |input| &mut input.title);
            }
        }

        #[derive(Debug, Default)]
        struct TwoBodies {
            first: NewUser,
            second: NewUser,
        }

        impl Bind for TwoBodies {
            fn bindings(fields: &mut Fields<Self>) {
                fields.field("first", "body", |input| &mut input.first).field("second", "body", |input| &mut input.second);
            }
        }

        let body_and_form = Adapter::new(|_input: BodyAndForm| async {});
        assert!(matches!(body_and_form, Err(CompileError::IncompatiblePayloadBinding)));

        let two_bodies = Adapter::new(|_input: TwoBodies| async {});
        assert!(matches!(two_bodies, Err(CompileError::DuplicateBody { first: "first", second: "second" })));
    }
}
