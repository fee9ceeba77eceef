use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const BOOKING_CODE_PREFIX: &str = "BOOK-";
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CODE_LENGTH: usize = 6;

/// `BOOK-` followed by six uppercase base36 characters.
pub fn generate_booking_code() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_LENGTH)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}{}", BOOKING_CODE_PREFIX, suffix)
}

pub fn is_booking_code(code: &str) -> bool {
    code.strip_prefix(BOOKING_CODE_PREFIX).is_some_and(|suffix| {
        suffix.len() == CODE_LENGTH
            && suffix
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
    })
}

/// JSON document encoded into the ticket QR code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrPayload {
    pub booking_id: Uuid,
    pub code: String,
    pub user_id: Uuid,
    pub match_id: Uuid,
    pub issued_at: DateTime<Utc>,
}

impl QrPayload {
    pub fn encode(&self) -> AppResult<String> {
        serde_json::to_string(self)
            .map_err(|e| AppError::Internal(format!("Failed to encode QR payload: {}", e)))
    }

    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_have_the_expected_shape() {
        for _ in 0..200 {
            let code = generate_booking_code();
            assert_eq!(code.len(), 11);
            assert!(is_booking_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(!is_booking_code("BOOK-abc123"));
        assert!(!is_booking_code("BOOK-ABC12"));
        assert!(!is_booking_code("TICK-ABC123"));
    }

    #[test]
    fn qr_payload_carries_booking_identity() {
        let payload = QrPayload {
            booking_id: Uuid::new_v4(),
            code: "BOOK-7Q2ZK9".to_string(),
            user_id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
            issued_at: Utc::now(),
        };
        let raw = payload.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["code"], "BOOK-7Q2ZK9");
        assert_eq!(value["booking_id"], payload.booking_id.to_string());
        assert_eq!(QrPayload::decode(&raw), Some(payload));
    }
}
