use crate::error::{BoxError, ResolveError};
use bytes::Bytes;
use http_body::Body as HttpBody;
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The request payload stream, type-erased.
pub type ReqBody = UnsyncBoxBody<Bytes, BoxError>;

/// The request payload, readable exactly once.
///
/// Whoever consumes it first (the json body resolver, or the form decoder shared by the form and
/// file resolvers) takes the stream; every later attempt fails with
/// [`ResolveError::BodyConsumed`].
pub struct OptionReqBody {
    inner: Option<ReqBody>,
}

impl OptionReqBody {
    pub fn new<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self { inner: Some(body.map_err(Into::into).boxed_unsync()) }
    }

    pub fn empty() -> Self {
        Self::new(http_body_util::Empty::<Bytes>::new())
    }

    pub fn can_consume(&self) -> bool {
        self.inner.is_some()
    }

    pub async fn apply<T, F, Fut>(&mut self, f: F) -> Result<T, ResolveError>
    where
        F: FnOnce(ReqBody) -> Fut,
        Fut: Future<Output = Result<T, ResolveError>>,
    {
        let req_body = self.inner.take().ok_or(ResolveError::BodyConsumed)?;
        f(req_body).await
    }

    /// Consumes the payload and collects it into memory.
    pub async fn bytes(&mut self) -> Result<Bytes, ResolveError> {
        self.apply(|b| async move { b.collect().await.map(|c| c.to_bytes()).map_err(ResolveError::body_read) }).await
    }
}

impl From<ReqBody> for OptionReqBody {
    fn from(body: ReqBody) -> Self {
        OptionReqBody { inner: Some(body) }
    }
}

impl fmt::Debug for OptionReqBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionReqBody").field("consumed", &self.inner.is_none()).finish()
    }
}

/// The body of every response the adapter produces: empty, or a single json chunk.
#[derive(Debug)]
pub struct ResponseBody {
    inner: Option<Bytes>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { inner: Some(bytes) }
    }

    /// The remaining bytes, without polling.
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_deref().unwrap_or_default()
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(value: Vec<u8>) -> Self {
        if value.is_empty() { Self::empty() } else { Self::once(Bytes::from(value)) }
    }
}

impl From<()> for ResponseBody {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl HttpBody for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().inner.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        match &self.inner {
            None => SizeHint::with_exact(0),
            Some(bytes) => SizeHint::with_exact(bytes.len() as u64),
        }
    }
}
