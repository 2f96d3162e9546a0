use validator::Validate;

use crate::api::errors::ApiError;

const MAX_RECORD_ID_LEN: usize = 64;

pub(crate) fn validate_payload<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload.validate().map_err(ApiError::from)
}

/// Path ids are spliced into backend URLs, so only plain tokens are accepted.
pub(crate) fn validate_record_id(id: &str) -> Result<(), ApiError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_RECORD_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid record id".to_string()))
    }
}
