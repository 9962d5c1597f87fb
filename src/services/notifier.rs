use std::sync::Mutex;

use async_trait::async_trait;

/// Delivery channel for one-time codes. The real system mails them; the
/// default adapter just logs, which is enough for local development.
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    async fn send_otp(&self, email: &str, username: &str, otp: &str) -> Result<(), String>;
}

#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl OtpNotifier for LogNotifier {
    async fn send_otp(&self, email: &str, username: &str, otp: &str) -> Result<(), String> {
        tracing::info!(email, username, otp, "OTP issued");
        Ok(())
    }
}

/// Captures sent codes so tests can complete the verification flow.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl OtpNotifier for RecordingNotifier {
    async fn send_otp(&self, email: &str, _username: &str, otp: &str) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), otp.to_string()));
        Ok(())
    }
}
