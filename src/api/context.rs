//
//  bkt-cli
//  api/context.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Call Context
//!
//! [`CallContext`] is the cancellation handle threaded through every
//! transport and binding operation. It carries a cancellation token and an
//! optional deadline; both bound the whole exchange, retries and backoff
//! sleeps included.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use bkt::api::CallContext;
//!
//! let root = CallContext::background();
//! let ctx = root.with_timeout(Duration::from_secs(300)); // long download
//! root.cancel(); // also cancels `ctx`
//! assert!(ctx.is_cancelled());
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::common::ApiError;

/// Cancellation token plus optional deadline.
///
/// Cloning shares the token. Derived contexts ([`CallContext::with_timeout`],
/// [`CallContext::child`]) get a child token: cancelling the parent cancels
/// them, cancelling a child leaves the parent alone.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A fresh context with no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A child context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A child context with the earlier of the current and given deadlines.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// A child context with the same deadline.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fails fast when the context is already cancelled or expired.
    pub fn check(&self) -> Result<(), ApiError> {
        if self.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ApiError::Timeout),
            _ => Ok(()),
        }
    }

    /// Drives `fut` until it completes, the token fires, or the deadline passes.
    ///
    /// Cancellation wins over the deadline, which wins over completion, when
    /// several are ready at once. The future is dropped on cancellation or
    /// timeout, so no partial result escapes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ApiError::Cancelled),
            _ = expired => Err(ApiError::Timeout),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = CallContext::background();
        let value = ctx.run(async { Ok::<_, ApiError>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let ctx = CallContext::background().with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ApiError>(())
            })
            .await;
        assert!(matches!(result, Err(ApiError::Timeout)));
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child() {
        let root = CallContext::background();
        let child = root.with_timeout(Duration::from_secs(60));
        root.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(ApiError::Cancelled)));
        let result = child.run(async { Ok::<_, ApiError>(()) }).await;
        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    #[test]
    fn test_deadline_keeps_earliest() {
        let root = CallContext::background().with_timeout(Duration::from_secs(1));
        let longer = root.with_timeout(Duration::from_secs(60));
        assert_eq!(root.deadline(), longer.deadline());
    }
}
