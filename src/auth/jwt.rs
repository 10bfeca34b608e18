use std::time::{SystemTime, UNIX_EPOCH};

use crate::{model::worker::Worker, models::Claims};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

/// Builds the claims for a worker. Department and position are carried only
/// when `with_profile` is set (worker login).
pub fn claims_for(worker: &Worker, ttl: usize, with_profile: bool) -> Claims {
    let iat = now();
    Claims {
        sub: worker.id.clone(),
        email: worker.email.clone(),
        role: worker.role,
        department: worker.department.clone().filter(|_| with_profile),
        position: worker.position.clone().filter(|_| with_profile),
        iat,
        exp: iat + ttl,
        jti: Uuid::new_v4().to_string(),
    }
}

pub fn generate_token(claims: &Claims, secret: &str) -> Result<String, Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn worker() -> Worker {
        Worker {
            id: "kitchen1".into(),
            name: "Kitchen Worker".into(),
            email: "kitchen@pizzeria.com".into(),
            password_hash: String::new(),
            role: Role::Worker,
            department: Some("Kitchen".into()),
            position: Some("Pizza Chef".into()),
            hire_date: None,
            status: "active".into(),
        }
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let claims = claims_for(&worker(), 86_400, true);
        let token = generate_token(&claims, "secret").unwrap();

        let decoded = verify_token(&token, "secret").unwrap();
        assert_eq!(decoded.sub, "kitchen1");
        assert_eq!(decoded.role, Role::Worker);
        assert_eq!(decoded.department.as_deref(), Some("Kitchen"));
        assert_eq!(decoded.exp - decoded.iat, 86_400);
    }

    #[test]
    fn profile_fields_are_optional() {
        let claims = claims_for(&worker(), 60, false);
        assert!(claims.department.is_none());
        assert!(claims.position.is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token(&claims_for(&worker(), 60, false), "secret").unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = claims_for(&worker(), 0, false);
        // past the default 60s leeway
        claims.exp = claims.iat.saturating_sub(3_600);
        let token = generate_token(&claims, "secret").unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
