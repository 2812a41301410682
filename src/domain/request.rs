use super::ids::{RequestId, UserId};
use super::pricing::ConnectRequirement;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Closed requests accept no new applications and cannot be reopened.
    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Input for creating a service request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    /// Explicit requirement; derived from the price when absent.
    #[serde(default)]
    pub required_connect: Option<u32>,
}

/// A partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub required_connect: Option<u32>,
    pub status: Option<RequestStatus>,
}

/// A paid service request posted by a citizen.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub owner: UserId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub required_connect: u32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn create(
        owner: UserId,
        new: NewRequest,
        requirement: &dyn ConnectRequirement,
    ) -> Result<Self> {
        let title = non_empty(&new.title, "title")?;
        let category = non_empty(&new.category, "category")?;
        validate_price(new.price)?;
        let required_connect = match new.required_connect {
            Some(explicit) => validate_override(explicit, requirement)?,
            None => requirement.required_for(new.price),
        };

        let now = Utc::now();
        Ok(Self {
            id: RequestId::new(),
            owner,
            title,
            description: new.description.trim().to_string(),
            category,
            price: new.price,
            required_connect,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update.
    ///
    /// `required_connect` is re-derived when the price changes, unless the
    /// same update sets it explicitly. Validation happens before any field is
    /// written, so a rejected update leaves the request unchanged.
    pub fn apply_update(
        &mut self,
        update: RequestUpdate,
        requirement: &dyn ConnectRequirement,
    ) -> Result<()> {
        if let Some(status) = update.status
            && self.status.is_closed()
            && status != self.status
        {
            return Err(PaymentError::RequestClosed(self.status));
        }
        let title = update
            .title
            .as_deref()
            .map(|t| non_empty(t, "title"))
            .transpose()?;
        let category = update
            .category
            .as_deref()
            .map(|c| non_empty(c, "category"))
            .transpose()?;
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        let explicit = update
            .required_connect
            .map(|value| validate_override(value, requirement))
            .transpose()?;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(category) = category {
            self.category = category;
        }
        if let Some(description) = update.description {
            self.description = description.trim().to_string();
        }
        let price_changed = update.price.is_some_and(|price| price != self.price);
        if let Some(price) = update.price {
            self.price = price;
        }
        match explicit {
            Some(value) => self.required_connect = value,
            None if price_changed => self.required_connect = requirement.required_for(self.price),
            None => {}
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn non_empty(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Decimal) -> Result<()> {
    if price <= Decimal::ZERO {
        return Err(PaymentError::Validation(
            "price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_override(value: u32, requirement: &dyn ConnectRequirement) -> Result<u32> {
    let bounds = requirement.bounds();
    if !bounds.contains(&value) {
        return Err(PaymentError::Validation(format!(
            "required connect must be between {} and {}",
            bounds.start(),
            bounds.end()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::StepRequirement;
    use rust_decimal_macros::dec;

    fn new_request(price: Decimal) -> NewRequest {
        NewRequest {
            title: "Birth certificate".to_string(),
            description: "Need a copy".to_string(),
            category: "civil-registry".to_string(),
            price,
            required_connect: None,
        }
    }

    #[test]
    fn test_create_derives_required_connect() {
        let policy = StepRequirement::default();
        let request =
            ServiceRequest::create(UserId::new(), new_request(dec!(250)), &policy).unwrap();
        assert_eq!(request.required_connect, 3);
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[test]
    fn test_create_keeps_explicit_requirement() {
        let mut new = new_request(dec!(250));
        new.required_connect = Some(7);
        let request =
            ServiceRequest::create(UserId::new(), new, &StepRequirement::default()).unwrap();
        assert_eq!(request.required_connect, 7);
    }

    #[test]
    fn test_create_rejects_non_positive_price() {
        let policy = StepRequirement::default();
        let result = ServiceRequest::create(UserId::new(), new_request(dec!(0)), &policy);
        assert!(matches!(result, Err(PaymentError::Validation(_))));
    }

    #[test]
    fn test_price_change_recomputes_requirement() {
        let policy = StepRequirement::default();
        let mut request =
            ServiceRequest::create(UserId::new(), new_request(dec!(250)), &policy).unwrap();
        request
            .apply_update(
                RequestUpdate {
                    price: Some(dec!(720)),
                    ..Default::default()
                },
                &policy,
            )
            .unwrap();
        assert_eq!(request.required_connect, 8);
    }

    #[test]
    fn test_explicit_requirement_wins_over_price_change() {
        let policy = StepRequirement::default();
        let mut request =
            ServiceRequest::create(UserId::new(), new_request(dec!(250)), &policy).unwrap();
        request
            .apply_update(
                RequestUpdate {
                    price: Some(dec!(720)),
                    required_connect: Some(2),
                    ..Default::default()
                },
                &policy,
            )
            .unwrap();
        assert_eq!(request.required_connect, 2);
        assert_eq!(request.price, dec!(720));
    }

    #[test]
    fn test_unrelated_update_keeps_requirement() {
        let policy = StepRequirement::default();
        let mut new = new_request(dec!(250));
        new.required_connect = Some(9);
        let mut request = ServiceRequest::create(UserId::new(), new, &policy).unwrap();
        request
            .apply_update(
                RequestUpdate {
                    title: Some("Renewed certificate".to_string()),
                    ..Default::default()
                },
                &policy,
            )
            .unwrap();
        assert_eq!(request.required_connect, 9);
    }

    #[test]
    fn test_closed_request_cannot_reopen() {
        let policy = StepRequirement::default();
        let mut request =
            ServiceRequest::create(UserId::new(), new_request(dec!(250)), &policy).unwrap();
        request
            .apply_update(
                RequestUpdate {
                    status: Some(RequestStatus::Cancelled),
                    ..Default::default()
                },
                &policy,
            )
            .unwrap();
        let result = request.apply_update(
            RequestUpdate {
                status: Some(RequestStatus::Pending),
                ..Default::default()
            },
            &policy,
        );
        assert!(matches!(
            result,
            Err(PaymentError::RequestClosed(RequestStatus::Cancelled))
        ));
    }

    #[test]
    fn test_override_out_of_bounds_rejected() {
        let policy = StepRequirement::default();
        let mut request =
            ServiceRequest::create(UserId::new(), new_request(dec!(250)), &policy).unwrap();
        let result = request.apply_update(
            RequestUpdate {
                required_connect: Some(11),
                ..Default::default()
            },
            &policy,
        );
        assert!(result.is_err());
        assert_eq!(request.required_connect, 3);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }
}
