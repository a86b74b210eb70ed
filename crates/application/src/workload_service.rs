//! Workload executor.
//!
//! Builds one iteration's dataset record by record, in dependency order:
//! users, groups, memberships, user permissions, group permissions. Every
//! record goes through its own transaction to simulate a non-bulk client.

use std::sync::Arc;

use aceload_core::{AppResult, BusinessKey};
use aceload_domain::{
    AceGrant, Action, NewGroup, NewResource, NewUser, Principal, RecordCount, ResourceOrigin,
};
use tracing::debug;

use crate::load_ports::{AceRepository, EntityRepository};
use crate::timing::LogScope;

/// Number of rows and grants written by one load phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Users inserted.
    pub users: usize,
    /// Groups inserted.
    pub groups: usize,
    /// Membership rows inserted.
    pub memberships: usize,
    /// Resources inserted across both permission paths.
    pub resources: usize,
    /// Single-action grants merged into access control entries.
    pub grants: usize,
}

/// Application service executing the load phase of an iteration.
#[derive(Clone)]
pub struct WorkloadService {
    entities: Arc<dyn EntityRepository>,
    aces: Arc<dyn AceRepository>,
}

impl WorkloadService {
    /// Creates a workload service.
    #[must_use]
    pub fn new(entities: Arc<dyn EntityRepository>, aces: Arc<dyn AceRepository>) -> Self {
        Self { entities, aces }
    }

    /// Loads the dataset described by `counts`.
    ///
    /// Rejects counts that fail validation before writing anything. Any store
    /// error aborts the remaining steps and is returned as-is.
    pub async fn execute(&self, scope: LogScope, counts: &RecordCount) -> AppResult<LoadReport> {
        counts.validate()?;

        let users = scope
            .timed_detail("Add users", |scope| self.add_users(scope, counts.users))
            .await?;
        let groups = scope
            .timed_detail("Add groups", |scope| self.add_groups(scope, counts.groups))
            .await?;
        let memberships = scope
            .timed_detail("Assign users to groups", |scope| {
                self.assign_users_to_groups(scope, counts.members, counts.groups, counts.users)
            })
            .await?;
        let (user_resources, user_grants) = scope
            .timed_detail("Assign user permissions", |scope| {
                self.assign_permissions(
                    scope,
                    ResourceOrigin::User,
                    counts.user_permissions,
                    counts.users,
                )
            })
            .await?;
        let (group_resources, group_grants) = scope
            .timed_detail("Assign group permissions", |scope| {
                self.assign_permissions(
                    scope,
                    ResourceOrigin::Group,
                    counts.group_permissions,
                    counts.groups,
                )
            })
            .await?;

        Ok(LoadReport {
            users,
            groups,
            memberships,
            resources: user_resources + group_resources,
            grants: user_grants + group_grants,
        })
    }

    async fn add_users(&self, scope: LogScope, users: usize) -> AppResult<usize> {
        for ordinal in 0..users {
            let user = NewUser::placeholder(ordinal);
            scope
                .timed_detail(&format!("Add user {ordinal}"), |_| {
                    self.entities.add_user(&user)
                })
                .await?;
        }

        Ok(users)
    }

    async fn add_groups(&self, scope: LogScope, groups: usize) -> AppResult<usize> {
        for ordinal in 0..groups {
            let group = NewGroup::placeholder(ordinal);
            scope
                .timed_detail(&format!("Add group {ordinal}"), |_| {
                    self.entities.add_group(&group)
                })
                .await?;
        }

        Ok(groups)
    }

    /// Fills every group's member slots round-robin from one shared user
    /// counter, so consecutive groups continue where the previous one stopped.
    async fn assign_users_to_groups(
        &self,
        scope: LogScope,
        members: usize,
        groups: usize,
        users: usize,
    ) -> AppResult<usize> {
        let mut user = 0_usize;
        let mut assigned = 0_usize;
        for group in 0..groups {
            let group_key = BusinessKey::from_ordinal(group);
            for _ in 0..members {
                let user_key = BusinessKey::from_ordinal(user);
                scope
                    .timed_detail(&format!("Add user {user} to group {group}"), |_| {
                        self.entities.add_membership(&user_key, &group_key)
                    })
                    .await?;
                assigned += 1;
                user = (user + 1) % users;
            }
        }

        Ok(assigned)
    }

    /// Creates `permissions` resources for one origin and grants every action
    /// on each of them to every principal of that origin.
    async fn assign_permissions(
        &self,
        scope: LogScope,
        origin: ResourceOrigin,
        permissions: usize,
        principals: usize,
    ) -> AppResult<(usize, usize)> {
        let mut grants = 0_usize;
        for permission in 0..permissions {
            let resource = NewResource::placeholder(origin, permission);
            scope
                .timed_detail(&format!("Add resource {}", resource.key), |_| {
                    self.entities.add_resource(&resource)
                })
                .await?;

            for ordinal in 0..principals {
                let principal = origin.principal(ordinal);
                grants += scope
                    .timed_detail(
                        &format!("Allow {} to {principal}", resource.key),
                        |scope| self.allow_access(scope, &principal, &resource.key),
                    )
                    .await?;
            }
        }

        Ok((permissions, grants))
    }

    /// Grants each action in its own transaction instead of batching the
    /// full set, matching how a per-action API would be called.
    async fn allow_access(
        &self,
        scope: LogScope,
        principal: &Principal,
        resource: &BusinessKey,
    ) -> AppResult<usize> {
        for action in Action::all() {
            let grant = AceGrant::new(principal.clone(), resource.clone(), *action);
            let actions = scope
                .timed_detail(&format!("grant {}", action.as_str()), |_| {
                    self.aces.grant_action(&grant)
                })
                .await?;
            debug!(
                depth = scope.depth(),
                principal = %principal,
                resource = %resource,
                actions = %actions,
                "access control entry merged"
            );
        }

        Ok(Action::all().len())
    }
}

#[cfg(test)]
mod tests;
