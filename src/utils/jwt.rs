use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::policy::UserRole;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user id
    pub email: String,
    pub role: UserRole,
    pub cafe_id: Option<Uuid>, // staff and owners act on behalf of one café
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

pub fn create_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    cafe_id: Option<Uuid>,
    secret: &str,
    expiration_hours: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        cafe_id,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_cafe_scope() {
        let user = Uuid::new_v4();
        let cafe = Uuid::new_v4();
        let token = create_token(user, "door@cafe.test", UserRole::Staff, Some(cafe), "secret", 1)
            .expect("token");

        let claims = verify_token(&token, "secret").expect("claims");
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, UserRole::Staff);
        assert_eq!(claims.cafe_id, Some(cafe));
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = create_token(Uuid::new_v4(), "a@b.c", UserRole::Customer, None, "one", 1)
            .expect("token");
        let err = verify_token(&token, "two").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
