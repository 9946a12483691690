//! Pipeline construction and invocation tests, using in-process transports.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert2::{check, let_assert};
use plait::{
    Argument, BoxHandler, CancellationToken, Client, DirectFactory, Error, HandlerFactory,
    HandlerKind, Result,
};

use tokio::sync::Notify;

use common::{Recorder, Recording, RequestId, Stub, echo_transport, request, status_transport};

#[tokio::test]
async fn test_first_registered_handler_is_outermost() {
    let recorder = Recorder::default();
    let client = Client::builder()
        .transport(status_transport(200, recorder.clone()))
        .use_handler::<Recording>([
            Argument::value(recorder.clone()),
            Argument::value("first".to_string()),
        ])
        .use_handler::<Recording>([
            Argument::value(recorder.clone()),
            Argument::value("second".to_string()),
        ])
        .build()
        .expect("client");

    let response = client
        .execute(request("http://test.invalid/"))
        .await
        .expect("response");

    check!(response.status() == 200);
    check!(
        recorder.events()
            == [
                "first:request",
                "second:request",
                "transport",
                "second:response",
                "first:response",
            ]
    );
}

#[tokio::test]
async fn test_handler_not_delegating_short_circuits() {
    let recorder = Recorder::default();
    let client = Client::builder()
        .transport(status_transport(200, recorder.clone()))
        .use_handler::<Stub>([Argument::value(418_u16)])
        .use_handler::<Recording>([
            Argument::value(recorder.clone()),
            Argument::value("inner".to_string()),
        ])
        .build()
        .expect("client");

    let response = client
        .execute(request("http://test.invalid/"))
        .await
        .expect("response");

    check!(response.status() == 418);
    check!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_per_request_state_is_fresh() {
    let client = Client::builder()
        .transport(echo_transport())
        .use_handler::<RequestId>([])
        .build()
        .expect("client");

    let first = client
        .execute(request("http://test.invalid/"))
        .await
        .expect("response");
    let second = client
        .execute(request("http://test.invalid/"))
        .await
        .expect("response");

    let_assert!(Some(first_id) = first.header("x-request-id"));
    let_assert!(Some(second_id) = second.header("x-request-id"));
    check!(first_id != second_id);
}

#[tokio::test]
async fn test_default_request_header_reaches_transport() {
    let client = Client::builder()
        .transport(plait::ServiceTransport::new(tower::service_fn(
            |request: plait::Request| async move {
                let status = if request.header("X") == Some("1") { 200 } else { 400 };
                Ok::<_, Error>(plait::Response::with_status(status))
            },
        )))
        .use_default_request_header("X", "1")
        .build()
        .expect("client");

    let response = client
        .execute(request("http://test.invalid/"))
        .await
        .expect("response");

    check!(response.status() == 200);
}

#[tokio::test]
async fn test_inline_handlers() {
    let client = Client::builder()
        .transport(echo_transport())
        .use_fn(|next, mut request, cancellation| async move {
            request
                .headers_mut()
                .insert("x-fn".to_string(), "explicit".to_string());
            next.run(request, cancellation).await
        })
        .use_proceed(|mut proceed| async move {
            proceed
                .request_mut()
                .headers_mut()
                .insert("x-proceed".to_string(), "bound".to_string());
            let mut response = proceed.run().await?;
            response
                .headers_mut()
                .insert("x-after".to_string(), "yes".to_string());
            Ok::<_, Error>(response)
        })
        .build()
        .expect("client");

    let response = client
        .execute(request("http://test.invalid/"))
        .await
        .expect("response");

    check!(response.header("x-fn") == Some("explicit"));
    check!(response.header("x-proceed") == Some("bound"));
    check!(response.header("x-after") == Some("yes"));
}

#[test]
fn test_unsupported_kind_fails_build() {
    let result = Client::builder()
        .transport(echo_transport())
        .use_kind(HandlerKind::opaque::<Vec<u8>>(), [])
        .build();

    let_assert!(Err(err) = result);
    check!(err.is_construction());
    check!(err.to_string().ends_with("must implement Handler"));
}

#[test]
fn test_mismatched_argument_fails_build() {
    let result = Client::builder()
        .transport(echo_transport())
        .use_handler::<Recording>([Argument::value(5_u32)])
        .build();

    let_assert!(Err(Error::Construction { message, .. }) = result);
    check!(message.contains("position 1"));
}

#[test]
fn test_leftover_argument_fails_build() {
    let result = Client::builder()
        .transport(echo_transport())
        .use_handler::<RequestId>([Argument::value("unused".to_string())])
        .build();

    let_assert!(Err(Error::Construction { message, .. }) = result);
    check!(message.contains("unused"));
}

struct Refusing;

impl HandlerFactory for Refusing {
    fn create(&self, kind: &HandlerKind, _arguments: Vec<Argument>) -> Result<BoxHandler> {
        Err(Error::construction(kind.name(), "refused"))
    }
}

#[test]
fn test_last_factory_wins() {
    let refused = Client::builder()
        .transport(echo_transport())
        .use_factory(DirectFactory)
        .use_factory(Refusing)
        .use_handler::<RequestId>([])
        .build();
    check!(refused.is_err());

    let built = Client::builder()
        .transport(echo_transport())
        .use_factory(Refusing)
        .use_factory(DirectFactory)
        .use_handler::<RequestId>([])
        .build();
    check!(built.is_ok());
}

#[tokio::test]
async fn test_cancelled_send_never_enters_pipeline() {
    let recorder = Recorder::default();
    let entered = recorder.clone();
    let client = Client::builder()
        .transport(status_transport(200, recorder.clone()))
        .use_fn(move |next, request, cancellation| {
            entered.push("entered");
            next.run(request, cancellation)
        })
        .build()
        .expect("client");

    let cancellation = CancellationToken::new();
    cancellation.cancel();
    let result = client
        .send(request("http://test.invalid/"), cancellation)
        .await;

    let_assert!(Err(err) = result);
    check!(err.is_cancelled());
    check!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_handlers_observe_caller_cancellation() {
    let recorder = Recorder::default();
    let observed = Arc::new(Notify::new());
    let client = {
        let recorder = recorder.clone();
        let observed = Arc::clone(&observed);
        Client::builder()
            .transport(status_transport(200, Recorder::default()))
            .use_fn(move |next, request, cancellation: CancellationToken| {
                let watched = cancellation.clone();
                let recorder = recorder.clone();
                let observed = Arc::clone(&observed);
                tokio::spawn(async move {
                    watched.cancelled().await;
                    recorder.push("handler:cancelled");
                    observed.notify_one();
                });
                next.run(request, cancellation)
            })
            .use_fn(|next, request, cancellation| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                next.run(request, cancellation).await
            })
            .build()
            .expect("client")
    };

    let cancellation = CancellationToken::new();
    let trigger = cancellation.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = client
        .send(request("http://test.invalid/"), cancellation)
        .await;
    let_assert!(Err(Error::Cancelled) = result);

    let seen = tokio::time::timeout(Duration::from_secs(1), observed.notified()).await;
    check!(seen.is_ok());
    check!(recorder.events() == ["handler:cancelled"]);
}

#[tokio::test]
async fn test_concurrent_sends_are_isolated() {
    let client = Client::builder()
        .transport(status_transport(200, Recorder::default()))
        .use_fn(|next, request, cancellation| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            next.run(request, cancellation).await
        })
        .build()
        .expect("client");

    let cancelled = CancellationToken::new();
    let trigger = cancelled.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let (a, b) = tokio::join!(
        client.send(request("http://test.invalid/a"), cancelled),
        client.send(request("http://test.invalid/b"), CancellationToken::new()),
    );

    let_assert!(Err(Error::Cancelled) = a);
    let_assert!(Ok(response) = b);
    check!(response.status() == 200);
}
