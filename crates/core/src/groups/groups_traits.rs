use async_trait::async_trait;

use crate::db::DbConnection;
use crate::errors::Result;
use crate::groups::groups_model::{Group, Member, MemberRole, NewGroup};

/// Repository operations for groups and their rosters.
///
/// All methods take the transaction connection so that roster reads and the
/// writes that depend on them share one transaction.
pub trait GroupRepositoryTrait: Send + Sync {
    fn insert_group(&self, conn: &mut DbConnection, group: &Group) -> Result<()>;
    fn insert_member(&self, conn: &mut DbConnection, member: &Member) -> Result<()>;
    fn get_group(&self, conn: &mut DbConnection, group_id: &str) -> Result<Group>;
    fn list_members(&self, conn: &mut DbConnection, group_id: &str) -> Result<Vec<Member>>;
    fn find_member(
        &self,
        conn: &mut DbConnection,
        group_id: &str,
        user_id: &str,
    ) -> Result<Option<Member>>;
}

/// Service operations for groups.
#[async_trait]
pub trait GroupServiceTrait: Send + Sync {
    async fn create_group(
        &self,
        new_group: NewGroup,
        creator_user_id: &str,
        creator_role: MemberRole,
    ) -> Result<Group>;

    /// Adds a member to the group and runs the late-joiner hooks: a fresh
    /// pending vote for any open change request, and auto-enrollment as a
    /// goal participant when a challenger joins while a goal is upcoming or
    /// active.
    async fn add_member(&self, group_id: &str, user_id: &str, role: MemberRole) -> Result<Member>;

    fn get_group(&self, group_id: &str) -> Result<Group>;
    fn get_members(&self, group_id: &str) -> Result<Vec<Member>>;
}
