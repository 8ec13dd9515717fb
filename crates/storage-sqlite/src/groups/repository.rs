use diesel::prelude::*;

use accord_core::db::DbConnection;
use accord_core::groups::{Group, GroupRepositoryTrait, Member};
use accord_core::Result;

use super::model::{GroupDB, MemberDB};
use crate::errors::StorageError;
use crate::schema::{groups, members};

/// Stateless Diesel-backed group repository. Connections come from the
/// caller so repository reads and dependent writes share one transaction.
pub struct GroupRepository;

impl GroupRepository {
    pub fn new() -> Self {
        GroupRepository
    }
}

impl Default for GroupRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRepositoryTrait for GroupRepository {
    fn insert_group(&self, conn: &mut DbConnection, group: &Group) -> Result<()> {
        diesel::insert_into(groups::table)
            .values(GroupDB::from(group))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn insert_member(&self, conn: &mut DbConnection, member: &Member) -> Result<()> {
        diesel::insert_into(members::table)
            .values(MemberDB::from(member))
            .execute(conn)
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn get_group(&self, conn: &mut DbConnection, group_id: &str) -> Result<Group> {
        let group_db = groups::table
            .find(group_id)
            .first::<GroupDB>(conn)
            .map_err(StorageError::from)?;
        Ok(Group::from(group_db))
    }

    fn list_members(&self, conn: &mut DbConnection, group_id: &str) -> Result<Vec<Member>> {
        let members_db = members::table
            .filter(members::group_id.eq(group_id))
            .order(members::joined_at.asc())
            .load::<MemberDB>(conn)
            .map_err(StorageError::from)?;
        members_db.into_iter().map(Member::try_from).collect()
    }

    fn find_member(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>> {
        let member_db = members::table
            .filter(members::group_id.eq(group_id))
            .filter(members::user_id.eq(user_id))
            .first::<MemberDB>(conn)
            .optional()
            .map_err(StorageError::from)?;
        member_db.map(Member::try_from).transpose()
    }
}
