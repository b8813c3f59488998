//! # Canonical Log Line ミドルウェア
//!
//! リクエスト完了時に、メソッド・パス・ステータス・レイテンシを 1 行に集約した
//! サマリログを出力する tower Layer。
//!
//! TraceLayer のスパン内に配置すると、スパンに載せた `request_id` が
//! JSON ログに自動的に含まれる。
//!
//! ```text
//! SetRequestId → TraceLayer → CanonicalLogLineLayer → handler
//! ```

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use http::{Request, Response};
use tower::{Layer, Service};

/// `/health` と `/health/ready` はログ対象外
fn is_health_check_path(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

/// Canonical Log Line を出力する Layer
///
/// - 5xx 以外: INFO
/// - 5xx: WARN
/// - 内側の Service がエラー: ERROR
#[derive(Clone, Debug, Default)]
pub struct CanonicalLogLineLayer;

impl<S> Layer<S> for CanonicalLogLineLayer {
    type Service = CanonicalLogLineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CanonicalLogLineService { inner }
    }
}

#[derive(Clone, Debug)]
pub struct CanonicalLogLineService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CanonicalLogLineService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: std::fmt::Display + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // poll_ready 済みの inner を取り出し、クローンと差し替える
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let path = req.uri().path().to_owned();
        if is_health_check_path(&path) {
            return Box::pin(async move { inner.call(req).await });
        }

        let method = req.method().to_string();
        let start = Instant::now();

        Box::pin(async move {
            let result = inner.call(req).await;
            let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            match &result {
                Ok(response) if response.status().is_server_error() => {
                    tracing::warn!(
                        log.r#type = "canonical",
                        http.method = %method,
                        http.path = %path,
                        http.status_code = response.status().as_u16(),
                        http.latency_ms = latency_ms,
                        "リクエスト完了"
                    );
                }
                Ok(response) => {
                    tracing::info!(
                        log.r#type = "canonical",
                        http.method = %method,
                        http.path = %path,
                        http.status_code = response.status().as_u16(),
                        http.latency_ms = latency_ms,
                        "リクエスト完了"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        log.r#type = "canonical",
                        http.method = %method,
                        http.path = %path,
                        http.latency_ms = latency_ms,
                        error.message = %err,
                        "リクエスト処理エラー"
                    );
                }
            }

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        convert::Infallible,
        sync::{Arc, Mutex},
    };

    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[derive(Clone)]
    struct FixedStatusService(StatusCode);

    impl Service<Request<()>> for FixedStatusService {
        type Error = Infallible;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            let status = self.0;
            Box::pin(async move { Ok(Response::builder().status(status).body(()).unwrap()) })
        }
    }

    #[derive(Clone)]
    struct FailingService;

    impl Service<Request<()>> for FailingService {
        type Error = String;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;
        type Response = Response<()>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: Request<()>) -> Self::Future {
            Box::pin(async { Err("connection reset".to_string()) })
        }
    }

    #[derive(Debug, Clone)]
    struct Captured {
        level:  tracing::Level,
        fields: HashMap<String, String>,
    }

    #[derive(Clone, Default)]
    struct CaptureLayer {
        events: Arc<Mutex<Vec<Captured>>>,
    }

    struct FieldMap<'a>(&'a mut HashMap<String, String>);

    impl tracing::field::Visit for FieldMap<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }

        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
            self.0.insert(field.name().to_string(), value.to_string());
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = HashMap::new();
            event.record(&mut FieldMap(&mut fields));
            self.events.lock().unwrap().push(Captured {
                level: *event.metadata().level(),
                fields,
            });
        }
    }

    fn capture() -> (tracing::subscriber::DefaultGuard, Arc<Mutex<Vec<Captured>>>) {
        let layer = CaptureLayer::default();
        let events = layer.events.clone();
        let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
        (guard, events)
    }

    fn request(method: &str, path: &str) -> Request<()> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(())
            .unwrap()
    }

    #[rstest]
    #[case("/health", true)]
    #[case("/health/ready", true)]
    #[case("/healthy-products", false)]
    #[case("/api/reviews", false)]
    fn test_ヘルスチェックパスの判定(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_health_check_path(path), expected);
    }

    #[tokio::test]
    async fn test_正常レスポンスでメソッドとパスとステータスが記録される() {
        let (_guard, events) = capture();
        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(StatusCode::CREATED));

        let response = sut.call(request("POST", "/api/reviews")).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let event = &captured[0];
        assert_eq!(event.level, tracing::Level::INFO);
        assert_eq!(event.fields["log.type"], "canonical");
        assert_eq!(event.fields["http.method"], "POST");
        assert_eq!(event.fields["http.path"], "/api/reviews");
        assert_eq!(event.fields["http.status_code"], "201");
        assert!(event.fields.contains_key("http.latency_ms"));
    }

    #[tokio::test]
    async fn test_5xxレスポンスはwarnで記録される() {
        let (_guard, events) = capture();
        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(StatusCode::BAD_GATEWAY));

        sut.call(request("POST", "/api/checkout")).await.unwrap();

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].level, tracing::Level::WARN);
        assert_eq!(captured[0].fields["http.status_code"], "502");
    }

    #[tokio::test]
    async fn test_4xxレスポンスはinfoのまま記録される() {
        let (_guard, events) = capture();
        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(StatusCode::CONFLICT));

        sut.call(request("POST", "/api/reviews/abc/vote")).await.unwrap();

        let captured = events.lock().unwrap();
        assert_eq!(captured[0].level, tracing::Level::INFO);
    }

    #[tokio::test]
    async fn test_serviceエラー時にerrorレベルでメッセージが記録される() {
        let (_guard, events) = capture();
        let mut sut = CanonicalLogLineLayer.layer(FailingService);

        let result = sut.call(request("GET", "/api/reviews")).await;

        assert!(result.is_err());
        let captured = events.lock().unwrap();
        assert_eq!(captured[0].level, tracing::Level::ERROR);
        assert_eq!(captured[0].fields["error.message"], "connection reset");
    }

    #[tokio::test]
    async fn test_ヘルスチェックではログが出力されない() {
        let (_guard, events) = capture();
        let mut sut = CanonicalLogLineLayer.layer(FixedStatusService(StatusCode::OK));

        sut.call(request("GET", "/health")).await.unwrap();
        sut.call(request("GET", "/health/ready")).await.unwrap();

        assert!(events.lock().unwrap().is_empty());
    }
}
