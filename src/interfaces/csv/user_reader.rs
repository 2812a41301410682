use crate::domain::ids::UserId;
use crate::domain::user::{Role, User};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct UserRecord {
    #[serde(default)]
    id: Option<UserId>,
    name: String,
    #[serde(default)]
    phone_number: Option<String>,
    role: Role,
    #[serde(default)]
    connects: u32,
}

impl TryFrom<UserRecord> for User {
    type Error = PaymentError;

    fn try_from(record: UserRecord) -> Result<Self> {
        if record.name.is_empty() {
            return Err(PaymentError::Validation("user name is required".to_string()));
        }
        let mut user = User::new(record.name, record.role).with_connects(record.connects);
        if let Some(id) = record.id {
            user.id = id;
        }
        if let Some(phone) = record.phone_number.filter(|p| !p.is_empty()) {
            user = user.with_phone(phone);
        }
        Ok(user)
    }
}

/// Reads seed users from a CSV source with the header
/// `id,name,phone_number,role,connects`.
///
/// `id` may be left empty to mint a fresh identifier.
pub struct UserReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> UserReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes users, one `Result` per row.
    pub fn users(self) -> impl Iterator<Item = Result<User>> {
        self.reader
            .into_deserialize::<UserRecord>()
            .map(|result| result.map_err(PaymentError::from).and_then(User::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let id = UserId::new();
        let data = format!(
            "id, name, phone_number, role, connects\n\
             {id}, Abebe, 0911000000, officer, 5\n\
             , Sara, , citizen, 0"
        );
        let users: Vec<Result<User>> = UserReader::new(data.as_bytes()).users().collect();

        assert_eq!(users.len(), 2);
        let first = users[0].as_ref().unwrap();
        assert_eq!(first.id, id);
        assert_eq!(first.role, Role::Officer);
        assert_eq!(first.connects, 5);
        assert_eq!(first.phone_number.as_deref(), Some("0911000000"));

        let second = users[1].as_ref().unwrap();
        assert_ne!(second.id, id);
        assert_eq!(second.phone_number, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "id,name,phone_number,role,connects\n,Abebe,,mayor,5\n,Sara,,citizen,-1";
        let users: Vec<Result<User>> = UserReader::new(data.as_bytes()).users().collect();

        assert!(users[0].is_err());
        assert!(users[1].is_err());
    }
}
