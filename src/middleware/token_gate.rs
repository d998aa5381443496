/// Token Gate Middleware
///
/// Runs [`AuthGate::verify`] for the wrapped routes and injects the accepted
/// [`Claims`] into request extensions (`web::ReqData<Claims>` in handlers).

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{AuthGate, Claims, TokenType};
use crate::error::AppError;

/// Gate for routes that require a token of one type
pub struct TokenGate {
    gate: AuthGate,
    required: TokenType,
}

impl TokenGate {
    pub fn new(gate: AuthGate, required: TokenType) -> Self {
        Self { gate, required }
    }

    pub fn access(gate: AuthGate) -> Self {
        Self::new(gate, TokenType::Access)
    }

    pub fn refresh(gate: AuthGate) -> Self {
        Self::new(gate, TokenType::Refresh)
    }
}

impl<S, B> Transform<S, ServiceRequest> for TokenGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TokenGateService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(TokenGateService {
            service: Rc::new(service),
            gate: self.gate.clone(),
            required: self.required,
        }))
    }
}

pub struct TokenGateService<S> {
    service: Rc<S>,
    gate: AuthGate,
    required: TokenType,
}

impl<S, B> Service<ServiceRequest> for TokenGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let service = self.service.clone();
        let gate = self.gate.clone();
        let required = self.required;

        Box::pin(async move {
            let claims: Claims = gate
                .verify(authorization.as_deref(), required)
                .await
                .map_err(AppError::from)?;

            tracing::debug!(
                user_id = %claims.sub,
                token_type = %claims.token_type,
                "Token accepted"
            );

            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
