use super::application::Application;
use super::ids::{ApplicationId, ChatRoomId, UserId};
use super::request::ServiceRequest;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A private conversation opened once an application is paid for.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ChatRoom {
    pub id: ChatRoomId,
    pub participants: [UserId; 2],
    pub application_id: ApplicationId,
    pub request_title: String,
    pub category: String,
    pub price: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// Opens a room between the applying officer and the request owner,
    /// seeded with the request's title, category and the agreed price.
    pub fn for_application(application: &Application, request: &ServiceRequest) -> Result<Self> {
        if application.officer_id == request.owner {
            return Err(PaymentError::Validation(
                "a chat room needs two distinct participants".to_string(),
            ));
        }
        Ok(Self {
            id: ChatRoomId::new(),
            participants: [application.officer_id, request.owner],
            application_id: application.id,
            request_title: request.title.clone(),
            category: request.category.clone(),
            price: application.price,
            active: true,
            created_at: Utc::now(),
        })
    }

    pub fn includes(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }
}
