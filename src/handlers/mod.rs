use axum::{
    async_trait,
    extract::{Form, FromRequest, Request},
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::{
    error::{PageError, ServerError},
    week::{is_valid_iso_week, IsoWeek},
};

pub mod api;
pub mod login;
pub mod main;
pub mod user;

/// A validated form with some input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedForm(value))
    }
}

/// Flatten validation errors into messages for a form page, sorted by field.
pub(crate) fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| match &error.message {
                Some(message) => message.to_string(),
                None => format!("{}: invalid value", field),
            })
        })
        .collect()
}

/// The week named by a route, if it exists and is not in the future.
///
/// Years before 1 are not routes at all.
pub(crate) fn checked_week(year: i32, week: i32) -> Result<IsoWeek, ServerError> {
    if year < 1 {
        return Err(ServerError::NotFound);
    }
    let week = u32::try_from(week).map_err(|_| ServerError::InvalidWeek)?;
    if !is_valid_iso_week(year, week, Utc::now().date_naive()) {
        return Err(ServerError::InvalidWeek);
    }
    Ok(IsoWeek::new(year, week))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_week() {
        assert_eq!(checked_week(2017, 9).unwrap(), IsoWeek::new(2017, 9));
        assert!(matches!(checked_week(2017, -1), Err(ServerError::InvalidWeek)));
        assert!(matches!(checked_week(2017, 0), Err(ServerError::InvalidWeek)));
        assert!(matches!(checked_week(2099, 1), Err(ServerError::InvalidWeek)));
        assert!(matches!(checked_week(0, 1), Err(ServerError::NotFound)));
        assert!(matches!(checked_week(-5, 1), Err(ServerError::NotFound)));
    }
}
