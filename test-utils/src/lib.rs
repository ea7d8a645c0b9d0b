//! `test-utils` is used for testing in both `volley-lib` and `volley-bin`.
//! This crate does not depend on `volley-lib` or `volley-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Set up a mock server with the routes `/items/0` up to `/items/{n - 1}`.
/// Each route answers `{"id": <n>}` after the given delay and expects to be
/// called exactly once.
#[macro_export]
macro_rules! items_mock_server {
    ($n:expr, $delay:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        for id in 0..$n {
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path(format!("/items/{id}")))
                .respond_with(
                    wiremock::ResponseTemplate::new(http::StatusCode::OK)
                        .set_body_json(serde_json::json!({ "id": id }))
                        .set_delay($delay),
                )
                .expect(1)
                .mount(&mock_server)
                .await;
        }
        mock_server
    }};
}

/// Build `n` identical GET descriptors for the given URL
///
/// # Panic
///
/// This panics if the URL is invalid, so it should only be used for testing
#[macro_export]
macro_rules! descriptors {
    ($url:expr, $n:expr $(,)?) => {{
        let url: String = ($url).into();
        (0..$n)
            .map(|_| RequestDescriptor::try_from(url.as_str()).expect("Expected valid request URL"))
            .collect::<Vec<RequestDescriptor>>()
    }};
}

/// Build one GET descriptor per route of [`items_mock_server`]
#[macro_export]
macro_rules! item_descriptors {
    ($base:expr, $n:expr $(,)?) => {{
        let base: String = ($base).into();
        (0..$n)
            .map(|id| {
                RequestDescriptor::try_from(format!("{base}/items/{id}"))
                    .expect("Expected valid request URL")
            })
            .collect::<Vec<RequestDescriptor>>()
    }};
}
