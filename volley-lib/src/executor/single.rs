use async_trait::async_trait;

use super::{RequestExecutor, perform_request};
use crate::{RateLimiter, RequestDescriptor, ResponseResult, Result, Transport};

/// The default executor: one rate limited call per descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleRequest;

#[async_trait]
impl RequestExecutor for SingleRequest {
    async fn execute(
        &self,
        transport: &Transport,
        limiter: &RateLimiter,
        request: &RequestDescriptor,
    ) -> Result<ResponseResult> {
        perform_request(transport, limiter, request)
            .await
            .map(ResponseResult::Single)
    }
}
