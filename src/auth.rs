//! Caller identity. Authentication happens upstream; the edge proxy forwards
//! the authenticated user as headers.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::caller::Caller;
use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
const STAFF_ROLE: &str = "staff";

fn caller_from_request(req: &HttpRequest) -> Result<Caller, AppError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let is_staff = req
        .headers()
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.trim().eq_ignore_ascii_case(STAFF_ROLE));

    Ok(Caller { user_id, is_staff })
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller_from_request(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn reads_user_and_role() {
        let user = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, user.to_string()))
            .insert_header((USER_ROLE_HEADER, "staff"))
            .to_http_request();

        let caller = caller_from_request(&req).unwrap();
        assert_eq!(caller, Caller { user_id: user, is_staff: true });
    }

    #[test]
    fn role_defaults_to_customer() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .to_http_request();
        assert!(!caller_from_request(&req).unwrap().is_staff);
    }

    #[test]
    fn missing_or_malformed_user_is_unauthorized() {
        let missing = TestRequest::default().to_http_request();
        let malformed = TestRequest::default()
            .insert_header((USER_ID_HEADER, "42"))
            .to_http_request();

        assert!(matches!(caller_from_request(&missing), Err(AppError::Unauthorized(_))));
        assert!(matches!(caller_from_request(&malformed), Err(AppError::Unauthorized(_))));
    }
}
