//! Fault isolation for calls into plugin code.
//!
//! Plugin-supplied futures and closures may return an error or panic. Both are
//! flattened into a [`Fault`] so callers can log and continue instead of
//! unwinding through the runtime.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// A contained failure of plugin code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub reason: String,
    pub panicked: bool,
}

impl Fault {
    fn error(e: impl fmt::Display) -> Self {
        Self {
            reason: e.to_string(),
            panicked: false,
        }
    }

    fn panic(payload: Box<dyn Any + Send>) -> Self {
        Self {
            reason: panic_message(payload.as_ref()),
            panicked: true,
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.panicked {
            write!(f, "panicked: {}", self.reason)
        } else {
            f.write_str(&self.reason)
        }
    }
}

/// Await `fut`, converting both `Err` and a panic into a [`Fault`].
pub async fn isolate<T, E, F>(fut: F) -> Result<T, Fault>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Fault::error(e)),
        Err(payload) => Err(Fault::panic(payload)),
    }
}

/// Synchronous counterpart of [`isolate`], used around plugin factories.
pub fn isolate_sync<T, E, F>(f: F) -> Result<T, Fault>
where
    F: FnOnce() -> Result<T, E>,
    E: fmt::Display,
{
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Fault::error(e)),
        Err(payload) => Err(Fault::panic(payload)),
    }
}

pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_isolate_ok_and_err() {
        let ok = isolate(async { Ok::<_, String>(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = isolate(async { Err::<(), _>("boom") }).await.unwrap_err();
        assert_eq!(err.reason, "boom");
        assert!(!err.panicked);
    }

    #[tokio::test]
    async fn test_isolate_panic() {
        let fault = isolate(async {
            if true {
                panic!("bad plugin");
            }
            Ok::<(), String>(())
        })
        .await
        .unwrap_err();
        assert!(fault.panicked);
        assert_eq!(fault.reason, "bad plugin");
        assert_eq!(fault.to_string(), "panicked: bad plugin");
    }

    #[test]
    fn test_isolate_sync_formatted_panic() {
        let fault = isolate_sync(|| -> Result<(), String> { panic!("code {}", 42) }).unwrap_err();
        assert!(fault.panicked);
        assert_eq!(fault.reason, "code 42");
    }
}
