//! Who may act on a task: the bot owner, privileged users, or the task's owner.

use crate::config::MltConfig;
use crate::task::UserId;

/// Source of owner / privileged-user facts.
pub trait Permissions: Send + Sync {
    fn is_owner(&self, user: UserId) -> bool;
    fn is_privileged(&self, user: UserId) -> bool;

    /// Owner or privileged.
    fn is_sudo(&self, user: UserId) -> bool {
        self.is_owner(user) || self.is_privileged(user)
    }

    /// May `user` act on a task submitted by `task_owner`?
    fn may_act_on(&self, user: UserId, task_owner: UserId) -> bool {
        user == task_owner || self.is_sudo(user)
    }
}

/// Permissions taken from `owner_id` / `sudo_users` in the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigPermissions {
    owner_id: UserId,
    sudo_users: Vec<UserId>,
}

impl ConfigPermissions {
    pub fn new(owner_id: UserId, sudo_users: Vec<UserId>) -> Self {
        Self {
            owner_id,
            sudo_users,
        }
    }

    pub fn from_config(cfg: &MltConfig) -> Self {
        Self::new(cfg.owner_id, cfg.sudo_users.clone())
    }
}

impl Permissions for ConfigPermissions {
    fn is_owner(&self, user: UserId) -> bool {
        user == self.owner_id
    }

    fn is_privileged(&self, user: UserId) -> bool {
        self.sudo_users.contains(&user)
    }
}
