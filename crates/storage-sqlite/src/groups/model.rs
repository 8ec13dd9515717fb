//! Database models for groups and members.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;

use accord_core::errors::Error;
use accord_core::groups::{Group, Member, MemberRole};

use crate::errors::unknown_enum_value;

/// Database model for groups
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::groups)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GroupDB {
    pub id: String,
    pub name: String,
    pub time_zone: String,
    pub created_at: NaiveDateTime,
}

/// Database model for group members
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::members)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MemberDB {
    pub id: String,
    pub group_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: NaiveDateTime,
}

impl From<GroupDB> for Group {
    fn from(db: GroupDB) -> Self {
        Self {
            id: db.id,
            name: db.name,
            time_zone: db.time_zone,
            created_at: Utc.from_utc_datetime(&db.created_at),
        }
    }
}

impl From<&Group> for GroupDB {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id.clone(),
            name: group.name.clone(),
            time_zone: group.time_zone.clone(),
            created_at: group.created_at.naive_utc(),
        }
    }
}

impl TryFrom<MemberDB> for Member {
    type Error = Error;

    fn try_from(db: MemberDB) -> Result<Self, Error> {
        let role = MemberRole::from_str(&db.role)
            .ok_or_else(|| unknown_enum_value("members.role", &db.role))?;
        Ok(Self {
            id: db.id,
            group_id: db.group_id,
            user_id: db.user_id,
            role,
            joined_at: Utc.from_utc_datetime(&db.joined_at),
        })
    }
}

impl From<&Member> for MemberDB {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            group_id: member.group_id.clone(),
            user_id: member.user_id.clone(),
            role: member.role.as_str().to_string(),
            joined_at: member.joined_at.naive_utc(),
        }
    }
}
