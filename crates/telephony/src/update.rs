//! Mid-call injection
//!
//! Pushing a new call-control document into an already-answered, still-open
//! call, outside the normal synchronous webhook response. The synchronous
//! response window is too short to wait for reply generation, so replies
//! arrive through this path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::TelephonyError;

/// Live-call update API
#[async_trait]
pub trait CallUpdater: Send + Sync {
    /// Replace the live call's current instructions with `twiml`.
    ///
    /// May fail if the call has already ended.
    async fn update_call(&self, call_id: &str, twiml: &str) -> Result<(), TelephonyError>;
}

/// Twilio REST implementation of the live-call update API
pub struct TwilioCallUpdater {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    api_base: String,
}

impl TwilioCallUpdater {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl CallUpdater for TwilioCallUpdater {
    async fn update_call(&self, call_id: &str, twiml: &str) -> Result<(), TelephonyError> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            self.api_base, self.account_sid, call_id
        );

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("Twiml", twiml)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(TelephonyError::Gateway {
            status: status.as_u16(),
            message,
        })
    }
}

/// Mid-call injection controller.
///
/// Owns the retry policy: one retry after a short fixed delay, then
/// log-and-drop. A dropped injection degrades gracefully; the caller's next
/// utterance opens a fresh capture cycle.
pub struct InjectionController {
    updater: Arc<dyn CallUpdater>,
    retry_delay: Duration,
}

impl InjectionController {
    pub fn new(updater: Arc<dyn CallUpdater>, retry_delay: Duration) -> Self {
        Self {
            updater,
            retry_delay,
        }
    }

    /// Inject a rendered document into the live call.
    ///
    /// Returns Err only after both attempts have failed; the error has
    /// already been logged and callers are expected to continue the call.
    pub async fn inject(&self, call_id: &str, twiml: &str) -> Result<(), TelephonyError> {
        match self.updater.update_call(call_id, twiml).await {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!(
                    call_id = %call_id,
                    error = %first,
                    "Call update failed, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;

                match self.updater.update_call(call_id, twiml).await {
                    Ok(()) => Ok(()),
                    Err(second) => {
                        tracing::warn!(
                            call_id = %call_id,
                            error = %second,
                            "Call update failed twice, dropping injection"
                        );
                        Err(second)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Updater that fails a configured number of times before succeeding
    struct FlakyUpdater {
        failures_left: Mutex<u32>,
        calls: Mutex<Vec<String>>,
    }

    impl FlakyUpdater {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Mutex::new(failures),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CallUpdater for FlakyUpdater {
        async fn update_call(&self, call_id: &str, _twiml: &str) -> Result<(), TelephonyError> {
            self.calls.lock().push(call_id.to_string());
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(TelephonyError::Gateway {
                    status: 409,
                    message: "call not updatable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_injection_succeeds_first_try() {
        let updater = Arc::new(FlakyUpdater::new(0));
        let controller = InjectionController::new(updater.clone(), Duration::from_millis(1));

        assert!(controller.inject("CA123", "<Response/>").await.is_ok());
        assert_eq!(updater.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_injection_retries_once_on_transient_error() {
        let updater = Arc::new(FlakyUpdater::new(1));
        let controller = InjectionController::new(updater.clone(), Duration::from_millis(1));

        assert!(controller.inject("CA123", "<Response/>").await.is_ok());
        assert_eq!(updater.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_injection_drops_after_second_failure() {
        let updater = Arc::new(FlakyUpdater::new(5));
        let controller = InjectionController::new(updater.clone(), Duration::from_millis(1));

        assert!(controller.inject("CA123", "<Response/>").await.is_err());
        // exactly two attempts, never more
        assert_eq!(updater.calls.lock().len(), 2);
    }
}
