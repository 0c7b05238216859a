//! ID types for Fantasy Critic entities.

use crate::error::{FantasyCriticError, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a fresh random identifier.
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = FantasyCriticError;

            fn from_str(s: &str) -> Result<Self> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0.to_string()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                Uuid::parse_str(value.as_str()?)
                    .map(Self)
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

uuid_id!(
    /// Type-safe wrapper for user IDs.
    ///
    /// Identity is owned elsewhere; the rules engine only needs a stable key
    /// to tell league managers and publisher owners apart.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fantasy_critic::UserId;
    ///
    /// let id: UserId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
    /// assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    /// ```
    UserId
);
uuid_id!(
    /// Type-safe wrapper for league IDs.
    LeagueId
);
uuid_id!(PublisherId);
uuid_id!(PublisherGameId);
uuid_id!(MasterGameId);
uuid_id!(TradeId);
uuid_id!(BidId);
uuid_id!(DropId);
uuid_id!(AuctionId);
uuid_id!(ProcessSetId);
uuid_id!(MessageId);
uuid_id!(RequestId);
