use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, MatchedPath, State},
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, error, info, info_span, instrument, Instrument};

use crate::{
    domain::{CandidateMail, MailRequest, MailResult},
    mail::MailSender,
    SignalListener,
};

// Context

pub struct ApiContext<M: MailSender> {
    pub mail_sender: M,
}

// Types

type Result<T = ()> = std::result::Result<T, Error>;

// Errors

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    InvalidBody(String),
    #[error("{0}")]
    Mail(
        #[from]
        #[source]
        crate::mail::Error,
    ),
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    Validation(
        #[from]
        #[source]
        crate::domain::Error,
    ),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidBody(_) | Self::Validation(_) => {
                debug!("{self}");
                StatusCode::BAD_REQUEST
            }
            Self::Mail(_) => {
                error!("{self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::MethodNotAllowed => {
                debug!("{self}");
                StatusCode::METHOD_NOT_ALLOWED
            }
        };
        let resp = MailResult {
            error: Some(self.to_string()),
            success: false,
        };
        (status, Json(resp)).into_response()
    }
}

// Functions

pub async fn start_api<M: MailSender + 'static>(
    addr: SocketAddr,
    ctx: ApiContext<M>,
) -> anyhow::Result<()> {
    let mut sig = SignalListener::new()?;
    debug!("binding tcp listener");
    let tcp = TcpListener::bind(addr).await?;
    info!("server started");
    axum::serve(tcp, create_router(ctx))
        .with_graceful_shutdown(async move { sig.recv().await })
        .await?;
    info!("server stopped");
    Ok(())
}

fn create_router<M: MailSender + 'static>(ctx: ApiContext<M>) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or_default();
        let span = info_span!(
            "http_request",
            http.method = %req.method(),
            http.path = path,
        );
        debug!(parent: &span, "http request received");
        span
    });
    Router::new()
        .route("/_health", get(health))
        .route(
            "/mails",
            post(send_mail)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(Arc::new(ctx))
        .layer(trace_layer)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("authorization, x-client-info, apikey, content-type"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
}

#[instrument]
async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[instrument]
async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}

#[instrument]
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn send_mail<M: MailSender>(
    State(ctx): State<Arc<ApiContext<M>>>,
    payload: std::result::Result<Json<MailRequest>, JsonRejection>,
) -> Result<Json<MailResult>> {
    let Json(req) = payload.map_err(|err| Error::InvalidBody(err.body_text()))?;
    let mail: CandidateMail = req.try_into()?;
    let span = info_span!("send_mail", mail.kind = %mail.kind, mail.to = mail.to);
    async {
        debug!("sending candidate mail");
        ctx.mail_sender.send_candidate_mail(&mail).await?;
        info!("mail sent");
        Ok(Json(MailResult {
            error: None,
            success: true,
        }))
    }
    .instrument(span)
    .await
}

// Tests
