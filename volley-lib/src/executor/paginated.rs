use std::borrow::Cow;
use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use typed_builder::TypedBuilder;
use url::Url;

use super::{RequestExecutor, perform_request};
use crate::{ErrorKind, RateLimiter, RequestDescriptor, ResponseResult, Result, Transport};

/// Field that holds the link to the next page, unless configured otherwise
pub const DEFAULT_NEXT_FIELD: &str = "next";

/// Follows "next page" links until the last page.
///
/// After each page the decoded body is searched for [`Paginated::next_field`].
/// A string value there is resolved against the current page's URL and
/// fetched next with the same method, headers and body. A missing field,
/// `null`, or any other non-string value ends the sequence. So does a link to
/// a page that was already fetched for the same descriptor.
///
/// Field names starting with `/` are read as JSON pointers, which allows
/// nested links such as `/links/next`.
///
/// Pages of one descriptor are fetched strictly one after another, each going
/// through the rate limiter.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Paginated {
    /// Field holding the link to the next page
    #[builder(default = String::from(DEFAULT_NEXT_FIELD), setter(into))]
    next_field: String,

    /// Stop after this many pages, even if there is a next link
    #[builder(default, setter(strip_option))]
    max_pages: Option<usize>,
}

impl Default for Paginated {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Paginated {
    /// Resolve the next page link of `page`, if there is one
    fn next_url(&self, page: &Value, current: &Url) -> Result<Option<Url>> {
        let link = if self.next_field.starts_with('/') {
            page.pointer(&self.next_field)
        } else {
            page.get(&self.next_field)
        };

        match link {
            Some(Value::String(link)) if !link.is_empty() => current
                .join(link)
                .map(Some)
                .map_err(|source| ErrorKind::InvalidPageUrl {
                    link: link.clone(),
                    source,
                }),
            Some(Value::Null) | None => Ok(None),
            Some(other) => {
                log::debug!(
                    "Ignoring non-string pagination field `{}`: {other}",
                    self.next_field
                );
                Ok(None)
            }
        }
    }

    fn reached_limit(&self, pages: usize) -> bool {
        self.max_pages.is_some_and(|max| pages >= max)
    }
}

#[async_trait]
impl RequestExecutor for Paginated {
    async fn execute(
        &self,
        transport: &Transport,
        limiter: &RateLimiter,
        request: &RequestDescriptor,
    ) -> Result<ResponseResult> {
        let mut pages = Vec::new();
        let mut visited = HashSet::from([request.url.clone()]);
        let mut current = Cow::Borrowed(request);

        loop {
            let page = perform_request(transport, limiter, &current).await?;
            let next = self.next_url(&page, &current.url)?;
            pages.push(page);

            match next {
                Some(url) if !self.reached_limit(pages.len()) => {
                    if !visited.insert(url.clone()) {
                        log::warn!("Stopping pagination of {request}: {url} was already fetched");
                        break;
                    }
                    log::debug!("Following page {} of {request}: {url}", pages.len() + 1);
                    current = Cow::Owned(request.follow(url));
                }
                _ => break,
            }
        }

        Ok(ResponseResult::Pages(pages))
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::TransportSettings;

    async fn mount_page(server: &MockServer, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(StatusCode::OK).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn fetch(executor: &Paginated, url: String) -> Result<ResponseResult> {
        let transport = Transport::new(&TransportSettings::default()).unwrap();
        let request = RequestDescriptor::try_from(url).unwrap();
        executor
            .execute(&transport, &RateLimiter::Unlimited, &request)
            .await
    }

    #[tokio::test]
    async fn test_follows_next_links() {
        let server = MockServer::start().await;
        mount_page(&server, "/items", json!({"id": 1, "next": "/items/2"})).await;
        mount_page(
            &server,
            "/items/2",
            json!({"id": 2, "next": format!("{}/items/3", server.uri())}),
        )
        .await;
        mount_page(&server, "/items/3", json!({"id": 3, "next": null})).await;

        let result = fetch(&Paginated::default(), format!("{}/items", server.uri()))
            .await
            .unwrap();

        assert_eq!(
            result
                .into_values()
                .iter()
                .map(|page| page["id"].clone())
                .collect::<Vec<_>>(),
            vec![json!(1), json!(2), json!(3)]
        );
    }

    #[tokio::test]
    async fn test_single_page_without_next_field() {
        let server = MockServer::start().await;
        mount_page(&server, "/items", json!({"id": 1})).await;

        let result = fetch(&Paginated::default(), format!("{}/items", server.uri()))
            .await
            .unwrap();
        assert_eq!(result, ResponseResult::Pages(vec![json!({"id": 1})]));
    }

    #[tokio::test]
    async fn test_json_pointer_field() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", json!({"links": {"next": "/b"}})).await;
        mount_page(&server, "/b", json!({"links": {}})).await;

        let executor = Paginated::builder().next_field("/links/next").build();
        let result = fetch(&executor, format!("{}/a", server.uri()))
            .await
            .unwrap();
        assert_eq!(result.page_count(), 2);
    }

    #[tokio::test]
    async fn test_max_pages() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", json!({"next": "/b"})).await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(StatusCode::OK))
            .expect(0)
            .mount(&server)
            .await;

        let executor = Paginated::builder().max_pages(1).build();
        let result = fetch(&executor, format!("{}/a", server.uri()))
            .await
            .unwrap();
        assert_eq!(result.page_count(), 1);
    }

    #[tokio::test]
    async fn test_link_back_to_fetched_page_ends_pagination() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", json!({"id": "a", "next": "/b"})).await;
        mount_page(&server, "/b", json!({"id": "b", "next": "/a"})).await;

        let result = fetch(&Paginated::default(), format!("{}/a", server.uri()))
            .await
            .unwrap();
        assert_eq!(
            result,
            ResponseResult::Pages(vec![
                json!({"id": "a", "next": "/b"}),
                json!({"id": "b", "next": "/a"}),
            ])
        );
    }

    #[tokio::test]
    async fn test_self_link_ends_pagination() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", json!({"next": "/a"})).await;

        let result = fetch(&Paginated::default(), format!("{}/a", server.uri()))
            .await
            .unwrap();
        assert_eq!(result.page_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_page_fails_the_whole_request() {
        let server = MockServer::start().await;
        mount_page(&server, "/a", json!({"next": "/b"})).await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(StatusCode::TOO_MANY_REQUESTS))
            .mount(&server)
            .await;

        let error = fetch(&Paginated::default(), format!("{}/a", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(StatusCode::TOO_MANY_REQUESTS));
    }

    #[test]
    fn test_non_string_next_ends_pagination() {
        let current = Url::parse("https://example.com/a").unwrap();
        let executor = Paginated::default();
        assert_eq!(
            executor.next_url(&json!({"next": 2}), &current).unwrap(),
            None
        );
        assert_eq!(executor.next_url(&json!([1, 2]), &current).unwrap(), None);
    }
}
