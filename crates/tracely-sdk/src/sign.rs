//! Request signing.
//!
//! Every report carries `X-App-Id`, `X-Timestamp`, `X-Nonce` and
//! `X-Signature`, where the signature is the lowercase hex HMAC-SHA256 of
//! `app_id + timestamp + nonce` keyed by the application secret. Headers are
//! built per request and never reused.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha2::Sha256;
use tracely_common_config::TracelyConfig;
use tracely_common_core::Clock;
use tracely_common_http::{headers, RequestBuilder};

type HmacSha256 = Hmac<Sha256>;

/// One request's authentication headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub app_id: String,
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

impl AuthHeaders {
    /// Header name/value pairs in wire order.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            (headers::X_APP_ID, self.app_id.as_str()),
            (headers::X_TIMESTAMP, self.timestamp.as_str()),
            (headers::X_NONCE, self.nonce.as_str()),
            (headers::X_SIGNATURE, self.signature.as_str()),
        ]
    }

    /// Add these headers to a request.
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        self.pairs()
            .into_iter()
            .fold(request, |request, (name, value)| request.header(name, value))
    }
}

/// 128 random bits from the OS as 32 lowercase hex characters.
///
/// Falls back to the clock's nanoseconds mixed with the thread RNG when the OS
/// source is unavailable; that path is unique in practice but not
/// cryptographically strong.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => hex::encode(bytes),
        Err(e) => {
            tracing::warn!(error = %e, "OS random source unavailable, using fallback nonce");
            fallback_nonce()
        }
    }
}

fn fallback_nonce() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}{:016x}", nanos, rand::thread_rng().gen::<u64>())
}

/// HMAC-SHA256 of `app_id + timestamp + nonce`, keyed by `app_secret`.
pub fn generate_signature(app_id: &str, app_secret: &str, timestamp: &str, nonce: &str) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(app_secret.as_bytes()) else {
        tracing::error!("app secret rejected as an HMAC key");
        return String::new();
    };
    mac.update(app_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(nonce.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Build a fresh header set, reading the clock once and drawing a new nonce.
pub fn build_headers(config: &TracelyConfig, clock: &dyn Clock) -> AuthHeaders {
    let timestamp = config.timestamp_unit.render(clock.now_millis());
    let nonce = generate_nonce();
    let signature = generate_signature(
        &config.app_id,
        config.app_secret.expose(),
        &timestamp,
        &nonce,
    );

    AuthHeaders {
        app_id: config.app_id.clone(),
        timestamp,
        nonce,
        signature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tracely_common_config::TimestampUnit;
    use tracely_common_core::ManualClock;

    fn is_lower_hex(s: &str) -> bool {
        s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 32);
        assert!(is_lower_hex(&nonce));
        assert_ne!(nonce, generate_nonce());
    }

    #[test]
    fn test_fallback_nonce_is_hex() {
        let nonce = fallback_nonce();
        assert!(nonce.len() > 16);
        assert!(is_lower_hex(&nonce));
    }

    #[test]
    fn test_signature_known_vector() {
        // HMAC-SHA256(key="key", "The quick brown fox jumps over the lazy dog")
        let signature = generate_signature(
            "The quick brown fox ",
            "key",
            "jumps over ",
            "the lazy dog",
        );
        assert_eq!(
            signature,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_signature_shape() {
        let signature = generate_signature("a1", "s1", "1700000000000", "abc");
        assert_eq!(signature.len(), 64);
        assert!(is_lower_hex(&signature));
    }

    #[test]
    fn test_signature_accepts_empty_and_long_secrets() {
        let long_secret = "s".repeat(200);
        for secret in ["", long_secret.as_str()] {
            let signature = generate_signature("a1", secret, "1700000000000", "abc");
            assert_eq!(signature.len(), 64, "secret of {} bytes", secret.len());
        }
    }

    #[test]
    fn test_build_headers_uses_configured_unit() {
        let clock = ManualClock::new(1_700_000_000_123);
        let config = TracelyConfig::new("a1", "s1", "http://h");

        let headers = build_headers(&config, &clock);
        assert_eq!(headers.app_id, "a1");
        assert_eq!(headers.timestamp, "1700000000123");
        assert_eq!(
            headers.signature,
            generate_signature("a1", "s1", &headers.timestamp, &headers.nonce)
        );

        let config = config.with_timestamp_unit(TimestampUnit::Seconds);
        assert_eq!(build_headers(&config, &clock).timestamp, "1700000000");
    }

    #[test]
    fn test_headers_are_fresh_per_call() {
        let clock = ManualClock::new(1_000);
        let config = TracelyConfig::new("a1", "s1", "http://h");
        let first = build_headers(&config, &clock);
        let second = build_headers(&config, &clock);
        assert_ne!(first.nonce, second.nonce);
        assert_ne!(first.signature, second.signature);
    }

    #[test]
    fn test_apply_sets_all_headers() {
        let clock = ManualClock::new(1_000);
        let config = TracelyConfig::new("a1", "s1", "http://h");
        let request = build_headers(&config, &clock).apply(RequestBuilder::new());
        for name in ["x-app-id", "x-timestamp", "x-nonce", "x-signature"] {
            assert!(request.headers().contains_key(name), "missing {}", name);
        }
    }

    proptest! {
        #[test]
        fn prop_signature_is_deterministic(
            app_id in "[a-z0-9-]{1,16}",
            secret in ".{0,40}",
            ts in 0u64..u64::MAX,
            nonce in "[0-9a-f]{32}",
        ) {
            let ts = ts.to_string();
            let a = generate_signature(&app_id, &secret, &ts, &nonce);
            let b = generate_signature(&app_id, &secret, &ts, &nonce);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.len(), 64);
        }

        #[test]
        fn prop_changing_any_input_changes_digest(
            app_id in "[a-z]{1,8}",
            secret in "[a-z]{1,8}",
            ts in 1u64..1_000_000_000,
            nonce in "[0-9a-f]{32}",
        ) {
            let ts_s = ts.to_string();
            let base = generate_signature(&app_id, &secret, &ts_s, &nonce);

            let other_secret = format!("{}x", secret);
            prop_assert_ne!(&base, &generate_signature(&app_id, &other_secret, &ts_s, &nonce));
            // Appending to the last field keeps the concatenation distinct.
            let other_nonce = format!("{}0", nonce);
            prop_assert_ne!(&base, &generate_signature(&app_id, &secret, &ts_s, &other_nonce));
            let other_ts = (ts + 1).to_string();
            prop_assert_ne!(&base, &generate_signature(&app_id, &secret, &other_ts, &nonce));
        }
    }
}
