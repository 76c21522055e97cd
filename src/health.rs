//! Kubernetes health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Is the storage root usable? Failure → pulled from the load balancer. |

use std::sync::Arc;

use http::StatusCode;

use crate::upload::Uploads;
use crate::{Request, Response};

/// Liveness probe. Always `200 ok`; no dependencies on purpose.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// Readiness probe.
///
/// `200 ready` while the storage root is still a directory. A volume that
/// was unmounted or deleted under the process turns this into `503`.
pub async fn readiness(req: Request) -> Response {
    let Some(uploads) = req.extension::<Arc<Uploads>>().cloned() else {
        return Response::text("ready");
    };

    match tokio::fs::metadata(uploads.root()).await {
        Ok(meta) if meta.is_dir() => Response::text("ready"),
        Ok(_) => unavailable("storage root is not a directory"),
        Err(e) => unavailable(&format!("storage root unavailable: {e}")),
    }
}

fn unavailable(reason: &str) -> Response {
    tracing::warn!("readiness check failed: {reason}");
    Response::builder()
        .status(StatusCode::SERVICE_UNAVAILABLE)
        .text("storage unavailable")
}
