use std::sync::Arc;

use crate::application::ProxyService;
use crate::domain::Endpoints;

use super::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct HttpState {
    pub proxy: ProxyService,
    pub endpoints: Arc<Endpoints>,
    pub rate_limiter: Arc<RateLimiter>,
}
