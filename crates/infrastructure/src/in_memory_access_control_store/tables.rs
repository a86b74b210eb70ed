use std::collections::{BTreeMap, BTreeSet};

use aceload_application::{ResourceGrant, TableCounts};
use aceload_core::{AppError, AppResult, BusinessKey};
use aceload_domain::{
    AceGrant, ActionList, EntityKind, NewGroup, NewResource, NewUser, Principal,
};

/// Surrogate key of the principal an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PrincipalId {
    User(i64),
    Group(i64),
}

/// Rows of one entity kind, indexed by surrogate and by business key.
#[derive(Debug, Clone)]
struct KeyedTable<T> {
    rows: BTreeMap<i64, (BusinessKey, T)>,
    ids: BTreeMap<BusinessKey, i64>,
}

impl<T> Default for KeyedTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            ids: BTreeMap::new(),
        }
    }
}

impl<T> KeyedTable<T> {
    fn find(&self, key: &BusinessKey) -> Option<i64> {
        self.ids.get(key).copied()
    }

    fn get(&self, id: i64) -> Option<&T> {
        self.rows.get(&id).map(|(_, row)| row)
    }

    fn insert(&mut self, id: i64, key: &BusinessKey, row: T) {
        self.ids.insert(key.clone(), id);
        self.rows.insert(id, (key.clone(), row));
    }

    fn remove(&mut self, key: &BusinessKey) -> Option<i64> {
        let id = self.ids.remove(key)?;
        self.rows.remove(&id);
        Some(id)
    }

    /// Keys in insertion order.
    fn keys(&self) -> Vec<BusinessKey> {
        self.rows.values().map(|(key, _)| key.clone()).collect()
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Row storage.
///
/// Every mutation checks its preconditions before writing, so a method that
/// returns an error has left the tables untouched.
#[derive(Debug, Clone, Default)]
pub(super) struct Tables {
    next_id: i64,
    users: KeyedTable<NewUser>,
    groups: KeyedTable<NewGroup>,
    resources: KeyedTable<NewResource>,
    user_groups: BTreeSet<(i64, i64)>,
    group_users: BTreeSet<(i64, i64)>,
    aces: BTreeMap<(PrincipalId, i64), ActionList>,
    resource_aces: BTreeSet<(i64, PrincipalId)>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn find(&self, kind: EntityKind, key: &BusinessKey) -> Option<i64> {
        match kind {
            EntityKind::User => self.users.find(key),
            EntityKind::Group => self.groups.find(key),
            EntityKind::Resource => self.resources.find(key),
        }
    }

    fn resolve(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<i64> {
        self.find(kind, key)
            .ok_or_else(|| AppError::NotFound(format!("{kind} '{key}' does not exist")))
    }

    fn ensure_unique(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<()> {
        if self.find(kind, key).is_some() {
            return Err(AppError::Conflict(format!("{kind} '{key}' already exists")));
        }

        Ok(())
    }

    pub(super) fn insert_user(&mut self, user: &NewUser) -> AppResult<()> {
        self.ensure_unique(EntityKind::User, &user.key)?;
        let id = self.allocate_id();
        self.users.insert(id, &user.key, user.clone());
        Ok(())
    }

    pub(super) fn insert_group(&mut self, group: &NewGroup) -> AppResult<()> {
        self.ensure_unique(EntityKind::Group, &group.key)?;
        let id = self.allocate_id();
        self.groups.insert(id, &group.key, group.clone());
        Ok(())
    }

    pub(super) fn insert_resource(&mut self, resource: &NewResource) -> AppResult<()> {
        self.ensure_unique(EntityKind::Resource, &resource.key)?;
        let id = self.allocate_id();
        self.resources.insert(id, &resource.key, resource.clone());
        Ok(())
    }

    pub(super) fn insert_membership(
        &mut self,
        user: &BusinessKey,
        group: &BusinessKey,
    ) -> AppResult<()> {
        let user_id = self.resolve(EntityKind::User, user)?;
        let group_id = self.resolve(EntityKind::Group, group)?;
        if self.user_groups.contains(&(user_id, group_id)) {
            return Err(AppError::Conflict(format!(
                "user '{user}' is already a member of group '{group}'"
            )));
        }

        self.user_groups.insert((user_id, group_id));
        self.group_users.insert((group_id, user_id));
        Ok(())
    }

    pub(super) fn merge_action(&mut self, grant: &AceGrant) -> AppResult<ActionList> {
        let resource_id = self.resolve(EntityKind::Resource, &grant.resource)?;
        let principal_key = self.resolve(grant.principal.kind(), grant.principal.key())?;
        let principal = match grant.principal {
            Principal::User(_) => PrincipalId::User(principal_key),
            Principal::Group(_) => PrincipalId::Group(principal_key),
        };

        let actions = match self.aces.remove(&(principal, resource_id)) {
            Some(existing) => existing.merged(grant.action),
            None => ActionList::single(grant.action),
        };
        self.aces.insert((principal, resource_id), actions.clone());
        self.resource_aces.insert((resource_id, principal));
        Ok(actions)
    }

    pub(super) fn keys(&self, kind: EntityKind) -> Vec<BusinessKey> {
        match kind {
            EntityKind::User => self.users.keys(),
            EntityKind::Group => self.groups.keys(),
            EntityKind::Resource => self.resources.keys(),
        }
    }

    /// Removes an entity with its membership and access rows. Missing
    /// entities are ignored.
    pub(super) fn delete(&mut self, kind: EntityKind, key: &BusinessKey) {
        match kind {
            EntityKind::User => {
                let Some(id) = self.users.remove(key) else {
                    return;
                };
                let groups: Vec<i64> = self
                    .user_groups
                    .range((id, i64::MIN)..=(id, i64::MAX))
                    .map(|(_, group_id)| *group_id)
                    .collect();
                for group_id in groups {
                    self.user_groups.remove(&(id, group_id));
                    self.group_users.remove(&(group_id, id));
                }
                self.delete_principal_aces(PrincipalId::User(id));
            }
            EntityKind::Group => {
                let Some(id) = self.groups.remove(key) else {
                    return;
                };
                let users: Vec<i64> = self
                    .group_users
                    .range((id, i64::MIN)..=(id, i64::MAX))
                    .map(|(_, user_id)| *user_id)
                    .collect();
                for user_id in users {
                    self.group_users.remove(&(id, user_id));
                    self.user_groups.remove(&(user_id, id));
                }
                self.delete_principal_aces(PrincipalId::Group(id));
            }
            EntityKind::Resource => {
                let Some(id) = self.resources.remove(key) else {
                    return;
                };
                let principals: Vec<PrincipalId> = self
                    .resource_aces
                    .range((id, PrincipalId::User(i64::MIN))..=(id, PrincipalId::Group(i64::MAX)))
                    .map(|(_, principal)| *principal)
                    .collect();
                for principal in principals {
                    self.resource_aces.remove(&(id, principal));
                    self.aces.remove(&(principal, id));
                }
            }
        }
    }

    fn delete_principal_aces(&mut self, principal: PrincipalId) {
        let resources: Vec<i64> = self
            .aces
            .range((principal, i64::MIN)..=(principal, i64::MAX))
            .map(|((_, resource_id), _)| *resource_id)
            .collect();
        for resource_id in resources {
            self.aces.remove(&(principal, resource_id));
            self.resource_aces.remove(&(resource_id, principal));
        }
    }

    pub(super) fn counts(&self) -> TableCounts {
        TableCounts {
            users: self.users.len() as u64,
            groups: self.groups.len() as u64,
            memberships: self.user_groups.len() as u64,
            resources: self.resources.len() as u64,
            aces: self.aces.len() as u64,
        }
    }

    pub(super) fn grants_for_user(&self, user: &BusinessKey) -> Vec<ResourceGrant> {
        let Some(user_id) = self.users.find(user) else {
            return Vec::new();
        };
        let principal = PrincipalId::User(user_id);

        self.aces
            .range((principal, i64::MIN)..=(principal, i64::MAX))
            .filter_map(|((_, resource_id), actions)| {
                self.resources
                    .get(*resource_id)
                    .map(|resource| ResourceGrant {
                        resource: resource.key.clone(),
                        description: resource.description.clone(),
                        actions: actions.clone(),
                    })
            })
            .collect()
    }

    #[cfg(test)]
    pub(super) fn index_sizes(&self) -> (usize, usize, usize) {
        (
            self.users.ids.len() + self.groups.ids.len() + self.resources.ids.len(),
            self.group_users.len(),
            self.resource_aces.len(),
        )
    }
}
