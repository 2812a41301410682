use crate::domain::ids::UserId;
use crate::domain::user::{Role, User};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LedgerRecord<'a> {
    user: UserId,
    name: &'a str,
    role: Role,
    connects: u32,
    active: bool,
}

/// Writes user balances as CSV with the header `user,name,role,connects,active`.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes every user, ordered by name then id so output is stable.
    pub fn write_users(&mut self, mut users: Vec<User>) -> Result<()> {
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        for user in &users {
            self.writer.serialize(LedgerRecord {
                user: user.id,
                name: &user.name,
                role: user.role,
                connects: user.connects,
                active: user.active,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
