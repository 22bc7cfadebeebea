//! Caller identity forwarded by the upstream authentication layer.
//!
//! Token verification happens before requests reach this service; the
//! gateway passes the verified subject in `X-User-Id` and its role in
//! `X-User-Role` (`customer` when absent).

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::actor::{Actor, Role};
use crate::domain::errors::DomainError;
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Result<Option<&'a str>, AppError> {
    req.headers()
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| AppError::Unauthorized(format!("{name} header is not valid text")))
        })
        .transpose()
}

fn identify(req: &HttpRequest) -> Result<Actor, AppError> {
    let user_id = header(req, USER_ID_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_string()))?;
    let user_id = Uuid::parse_str(user_id.trim())
        .map_err(|_| AppError::Unauthorized(format!("{USER_ID_HEADER} is not a valid id")))?;

    let role = match header(req, USER_ROLE_HEADER)? {
        Some(role) => role.parse::<Role>().map_err(|e| match e {
            DomainError::Unauthorized(msg) => AppError::Unauthorized(msg),
            other => AppError::from(other),
        })?,
        None => Role::Customer,
    };

    Ok(Actor { user_id, role })
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identify(req))
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn defaults_to_customer() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .to_http_request();
        assert_eq!(identify(&req).expect("identified"), Actor::customer(id));
    }

    #[test]
    fn reads_admin_role() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, id.to_string()))
            .insert_header((USER_ROLE_HEADER, "admin"))
            .to_http_request();
        assert!(identify(&req).expect("identified").is_admin());
    }

    #[test]
    fn missing_or_malformed_identity_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(identify(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(matches!(identify(&req), Err(AppError::Unauthorized(_))));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((USER_ROLE_HEADER, "superuser"))
            .to_http_request();
        assert!(matches!(identify(&req), Err(AppError::Unauthorized(_))));
    }
}
