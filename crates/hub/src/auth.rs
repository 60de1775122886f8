//! Pure authorization decisions: translate an [`AuthContext`] and a
//! [`Channel`] into an allow/deny verdict. No hub state is touched here.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, SystemKind, UserKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub api_key_id: Option<String>,
    pub workspace_ids: HashSet<String>,
    pub is_admin: bool,
}

impl AuthContext {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn system() -> Self {
        Self {
            user_id: Some("system".to_string()),
            api_key_id: None,
            workspace_ids: HashSet::new(),
            is_admin: true,
        }
    }

    pub fn has_identity(&self) -> bool {
        self.user_id.is_some() || self.api_key_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AuthDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Optional hook gating `agent:*` subscriptions. Returns `true` if
/// `user_id`/`workspace_ids` may observe `agent_id`'s output.
pub type AgentAccessResolver<'a> = dyn Fn(&str, Option<&str>, &HashSet<String>) -> bool + 'a;

pub fn can_subscribe(
    auth: &AuthContext,
    channel: &Channel,
    resolver: Option<&AgentAccessResolver<'_>>,
) -> AuthDecision {
    if auth.is_admin {
        return AuthDecision::allow();
    }
    if !auth.has_identity() {
        return AuthDecision::deny("guests may not subscribe");
    }

    match channel {
        Channel::Agent { agent_id, .. } => match resolver {
            Some(resolve) => {
                if resolve(agent_id, auth.user_id.as_deref(), &auth.workspace_ids) {
                    AuthDecision::allow()
                } else {
                    AuthDecision::deny("not authorized to view this agent's output")
                }
            }
            None => AuthDecision::allow(),
        },
        Channel::Workspace { workspace_id, .. } => {
            if auth.workspace_ids.contains(workspace_id) {
                AuthDecision::allow()
            } else {
                AuthDecision::deny("not a member of this workspace")
            }
        }
        Channel::User { kind, user_id } => match kind {
            UserKind::Mail | UserKind::Notifications => {
                if auth.user_id.as_deref() == Some(user_id.as_str()) {
                    AuthDecision::allow()
                } else {
                    AuthDecision::deny("channel belongs to a different user")
                }
            }
        },
        Channel::System { .. } => AuthDecision::deny("system channels are admin-only"),
        Channel::Session { .. } | Channel::Fleet { .. } | Channel::Pipeline { .. } => {
            AuthDecision::allow()
        }
    }
}

pub fn can_publish(auth: &AuthContext, channel: &Channel) -> AuthDecision {
    if auth.is_admin {
        return AuthDecision::allow();
    }
    if !auth.has_identity() {
        return AuthDecision::deny("guests may not publish");
    }

    match channel {
        Channel::Agent { .. } => AuthDecision::deny("agent channels are produced internally only"),
        Channel::Workspace { workspace_id, .. } => {
            if auth.workspace_ids.contains(workspace_id) {
                AuthDecision::allow()
            } else {
                AuthDecision::deny("not a member of this workspace")
            }
        }
        Channel::User { kind, user_id } => match kind {
            UserKind::Mail => AuthDecision::allow(),
            UserKind::Notifications => {
                if auth.user_id.as_deref() == Some(user_id.as_str()) {
                    AuthDecision::allow()
                } else {
                    AuthDecision::deny("channel belongs to a different user")
                }
            }
        },
        Channel::System { kind } => match kind {
            SystemKind::Health | SystemKind::Processes => {
                AuthDecision::deny("system channels are admin-only")
            }
        },
        Channel::Session { .. } | Channel::Fleet { .. } | Channel::Pipeline { .. } => {
            AuthDecision::deny("internal-only channel")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{AgentKind, WorkspaceKind};

    fn workspace_channel(id: &str) -> Channel {
        Channel::Workspace {
            kind: WorkspaceKind::Git,
            workspace_id: id.to_string(),
        }
    }

    #[test]
    fn admin_can_do_anything() {
        let admin = AuthContext {
            is_admin: true,
            ..Default::default()
        };
        assert!(can_subscribe(&admin, &workspace_channel("w1"), None).allowed);
        assert!(can_publish(&admin, &workspace_channel("w1")).allowed);
        assert!(can_publish(
            &admin,
            &Channel::System {
                kind: SystemKind::Health
            }
        )
        .allowed);
    }

    #[test]
    fn guest_cannot_subscribe_or_publish() {
        let guest = AuthContext::guest();
        assert!(!can_subscribe(&guest, &workspace_channel("w1"), None).allowed);
        assert!(!can_publish(&guest, &workspace_channel("w1")).allowed);
    }

    #[test]
    fn workspace_membership_required() {
        let mut auth = AuthContext {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        auth.workspace_ids.insert("w1".to_string());
        assert!(can_subscribe(&auth, &workspace_channel("w1"), None).allowed);
        assert!(!can_subscribe(&auth, &workspace_channel("w2"), None).allowed);
    }

    #[test]
    fn user_notifications_require_matching_user() {
        let auth = AuthContext {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let mine = Channel::User {
            kind: UserKind::Notifications,
            user_id: "u1".to_string(),
        };
        let theirs = Channel::User {
            kind: UserKind::Notifications,
            user_id: "u2".to_string(),
        };
        assert!(can_subscribe(&auth, &mine, None).allowed);
        assert!(can_publish(&auth, &mine).allowed);
        assert!(!can_subscribe(&auth, &theirs, None).allowed);
        assert!(!can_publish(&auth, &theirs).allowed);
    }

    #[test]
    fn user_mail_publish_is_open_but_subscribe_is_not() {
        let auth = AuthContext {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let theirs = Channel::User {
            kind: UserKind::Mail,
            user_id: "u2".to_string(),
        };
        assert!(can_publish(&auth, &theirs).allowed);
        assert!(!can_subscribe(&auth, &theirs, None).allowed);
    }

    #[test]
    fn system_channels_deny_non_admin_both_ways() {
        let auth = AuthContext {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let sys = Channel::System {
            kind: SystemKind::Processes,
        };
        assert!(!can_subscribe(&auth, &sys, None).allowed);
        assert!(!can_publish(&auth, &sys).allowed);
    }

    #[test]
    fn agent_resolver_gates_subscription() {
        let auth = AuthContext {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let channel = Channel::Agent {
            kind: AgentKind::Output,
            agent_id: "agent-1".to_string(),
        };
        let deny_all: &AgentAccessResolver = &|_, _, _| false;
        assert!(!can_subscribe(&auth, &channel, Some(deny_all)).allowed);
        assert!(can_subscribe(&auth, &channel, None).allowed);
    }

    #[test]
    fn internal_scopes_subscribe_open_publish_denied() {
        let auth = AuthContext {
            user_id: Some("u1".to_string()),
            ..Default::default()
        };
        let session = Channel::Session {
            session_id: "s1".to_string(),
        };
        assert!(can_subscribe(&auth, &session, None).allowed);
        assert!(!can_publish(&auth, &session).allowed);
    }
}
