use std::collections::{BTreeSet, HashMap};

use aceload_core::{AppError, AppResult, BusinessKey};
use aceload_domain::{AceGrant, ActionList, EntityKind, NewGroup, NewResource, NewUser, Principal};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    AceRepository, EntityRepository, QueryProbeRepository, ResourceGrant, TableCounts,
    TeardownRepository,
};

/// Recording store shared by the service tests.
#[derive(Default)]
pub(crate) struct FakeLoadStore {
    pub(crate) state: Mutex<FakeState>,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub(crate) calls: Vec<String>,
    pub(crate) fail_on: BTreeSet<String>,
    pub(crate) users: BTreeSet<BusinessKey>,
    pub(crate) groups: BTreeSet<BusinessKey>,
    pub(crate) resources: BTreeSet<BusinessKey>,
    pub(crate) memberships: Vec<(BusinessKey, BusinessKey)>,
    pub(crate) aces: HashMap<(Principal, BusinessKey), ActionList>,
}

impl FakeLoadStore {
    pub(crate) async fn failing_on(labels: &[&str]) -> Self {
        let store = Self::default();
        store.state.lock().await.fail_on = labels.iter().map(|label| (*label).to_owned()).collect();
        store
    }

    pub(crate) async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }
}

impl FakeState {
    fn record(&mut self, label: String) -> AppResult<()> {
        let fails = self.fail_on.contains(&label);
        self.calls.push(label.clone());
        if fails {
            return Err(AppError::Internal(format!("injected failure at '{label}'")));
        }

        Ok(())
    }
}

#[async_trait]
impl EntityRepository for FakeLoadStore {
    async fn add_user(&self, user: &NewUser) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("add user {}", user.key))?;
        state.users.insert(user.key.clone());
        Ok(())
    }

    async fn add_group(&self, group: &NewGroup) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("add group {}", group.key))?;
        state.groups.insert(group.key.clone());
        Ok(())
    }

    async fn add_resource(&self, resource: &NewResource) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("add resource {}", resource.key))?;
        state.resources.insert(resource.key.clone());
        Ok(())
    }

    async fn add_membership(&self, user: &BusinessKey, group: &BusinessKey) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("add membership {user}->{group}"))?;
        state.memberships.push((user.clone(), group.clone()));
        Ok(())
    }
}

#[async_trait]
impl AceRepository for FakeLoadStore {
    async fn grant_action(&self, grant: &AceGrant) -> AppResult<ActionList> {
        let mut state = self.state.lock().await;
        state.record(format!(
            "grant {} {} {}",
            grant.principal,
            grant.resource,
            grant.action.as_str()
        ))?;

        let key = (grant.principal.clone(), grant.resource.clone());
        let merged = match state.aces.remove(&key) {
            Some(existing) => existing.merged(grant.action),
            None => ActionList::single(grant.action),
        };
        state.aces.insert(key, merged.clone());
        Ok(merged)
    }
}

#[async_trait]
impl TeardownRepository for FakeLoadStore {
    async fn list_keys(&self, kind: EntityKind) -> AppResult<Vec<BusinessKey>> {
        let mut state = self.state.lock().await;
        state.record(format!("list {kind}"))?;
        let keys = match kind {
            EntityKind::User => state.users.iter().cloned().collect(),
            EntityKind::Group => state.groups.iter().cloned().collect(),
            EntityKind::Resource => state.resources.iter().cloned().collect(),
        };
        Ok(keys)
    }

    async fn remove_entity(&self, kind: EntityKind, key: &BusinessKey) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.record(format!("remove {kind} {key}"))?;
        match kind {
            EntityKind::User => {
                state.memberships.retain(|(user, _)| user != key);
                state
                    .aces
                    .retain(|(principal, _), _| principal != &Principal::User(key.clone()));
                state.users.remove(key);
            }
            EntityKind::Group => {
                state.memberships.retain(|(_, group)| group != key);
                state
                    .aces
                    .retain(|(principal, _), _| principal != &Principal::Group(key.clone()));
                state.groups.remove(key);
            }
            EntityKind::Resource => {
                state.aces.retain(|(_, resource), _| resource != key);
                state.resources.remove(key);
            }
        }
        Ok(())
    }

    async fn count_rows(&self) -> AppResult<TableCounts> {
        let mut state = self.state.lock().await;
        state.record("count rows".to_owned())?;
        Ok(TableCounts {
            users: state.users.len() as u64,
            groups: state.groups.len() as u64,
            memberships: state.memberships.len() as u64,
            resources: state.resources.len() as u64,
            aces: state.aces.len() as u64,
        })
    }
}

#[async_trait]
impl QueryProbeRepository for FakeLoadStore {
    async fn list_user_keys(&self) -> AppResult<Vec<BusinessKey>> {
        let mut state = self.state.lock().await;
        state.record("list user keys".to_owned())?;
        Ok(state.users.iter().cloned().collect())
    }

    async fn resource_grants_for_user(&self, user: &BusinessKey) -> AppResult<Vec<ResourceGrant>> {
        let mut state = self.state.lock().await;
        state.record(format!("probe user {user}"))?;
        let principal = Principal::User(user.clone());
        Ok(state
            .aces
            .iter()
            .filter(|((stored_principal, _), _)| stored_principal == &principal)
            .map(|((_, resource), actions)| ResourceGrant {
                resource: resource.clone(),
                description: "some description".to_owned(),
                actions: actions.clone(),
            })
            .collect())
    }
}
