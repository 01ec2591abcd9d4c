use crate::body::ResponseBody;
use crate::request::RequestContext;
use async_trait::async_trait;
use http::Response;

/// A request handler that can be stored as a trait object, so adapters of different callback
/// types can live side by side in a host's routing table.
///
/// Handlers never fail: binding and callback errors are already turned into error responses.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: RequestContext) -> Response<ResponseBody>;
}

#[cfg(test)]
mod test {
    use crate::adapter::Adapter;
    use crate::fields::{Bind, Fields};
    use crate::handler::RequestHandler;
    use crate::reply::Json;
    use crate::request::{PathParams, RequestContext};
    use bytes::Bytes;
    use http::{Request, StatusCode};
    use http_body_util::Full;

    #[derive(Debug, Default)]
    struct Ping {
        name: String,
    }

    impl Bind for Ping {
        fn bindings(fields: &mut Fields<Self>) {
            fields.field("name", "query:name", |input| &mut input.name);
        }
    }

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    #[test]
    fn adapter_is_http_handler() {
        async fn ping(_input: Ping) {}

        let handler = Adapter::new(ping).unwrap();
        assert_is_handler(&handler);
    }

    #[tokio::test]
    async fn handlers_of_different_callbacks_share_a_table() {
        async fn silent(_input: Ping) {}
        async fn echo(input: Ping) -> Json<String> {
            Json(input.name)
        }

        let handlers: Vec<Box<dyn RequestHandler>> =
            vec![Box::new(Adapter::new(silent).unwrap()), Box::new(Adapter::new(echo).unwrap())];

        let mut statuses = Vec::new();
        for handler in &handlers {
            let request = Request::get("/ping?name=pong").body(Full::new(Bytes::new())).unwrap();
            let response = handler.invoke(RequestContext::from_request(request, PathParams::empty())).await;
            statuses.push(response.status());
        }

        assert_eq!(statuses, [StatusCode::NO_CONTENT, StatusCode::OK]);
    }
}
