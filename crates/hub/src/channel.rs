//! Typed channel model: string grammar `scope:kind[:id[:id...]]`.
//!
//! `parse` and `to_string` are inverses of each other for every
//! variant below (round-trip law, spec.md §8 property 1). Parsing is
//! total: malformed input returns `None`, it never panics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Channel {
    Agent {
        kind: AgentKind,
        agent_id: String,
    },
    Workspace {
        kind: WorkspaceKind,
        workspace_id: String,
    },
    User {
        kind: UserKind,
        user_id: String,
    },
    System {
        kind: SystemKind,
    },
    Session {
        session_id: String,
    },
    Fleet {
        fleet_id: String,
    },
    Pipeline {
        pipeline_id: String,
        run_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Output,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceKind {
    Git,
    Conflicts,
    Reservations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Mail,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemKind {
    Health,
    Processes,
}

impl AgentKind {
    fn as_str(self) -> &'static str {
        match self {
            AgentKind::Output => "output",
            AgentKind::Status => "status",
        }
    }
    fn parse(s: &str) -> Option<Self> {
        match s {
            "output" => Some(AgentKind::Output),
            "status" => Some(AgentKind::Status),
            _ => None,
        }
    }
}

impl WorkspaceKind {
    fn as_str(self) -> &'static str {
        match self {
            WorkspaceKind::Git => "git",
            WorkspaceKind::Conflicts => "conflicts",
            WorkspaceKind::Reservations => "reservations",
        }
    }
    fn parse(s: &str) -> Option<Self> {
        match s {
            "git" => Some(WorkspaceKind::Git),
            "conflicts" => Some(WorkspaceKind::Conflicts),
            "reservations" => Some(WorkspaceKind::Reservations),
            _ => None,
        }
    }
}

impl UserKind {
    fn as_str(self) -> &'static str {
        match self {
            UserKind::Mail => "mail",
            UserKind::Notifications => "notifications",
        }
    }
    fn parse(s: &str) -> Option<Self> {
        match s {
            "mail" => Some(UserKind::Mail),
            "notifications" => Some(UserKind::Notifications),
            _ => None,
        }
    }
}

impl SystemKind {
    fn as_str(self) -> &'static str {
        match self {
            SystemKind::Health => "health",
            SystemKind::Processes => "processes",
        }
    }
    fn parse(s: &str) -> Option<Self> {
        match s {
            "health" => Some(SystemKind::Health),
            "processes" => Some(SystemKind::Processes),
            _ => None,
        }
    }
}

impl Channel {
    /// Render the canonical wire string for this channel.
    pub fn to_string_id(&self) -> String {
        match self {
            Channel::Agent { kind, agent_id } => format!("agent:{}:{}", kind.as_str(), agent_id),
            Channel::Workspace { kind, workspace_id } => {
                format!("workspace:{}:{}", kind.as_str(), workspace_id)
            }
            Channel::User { kind, user_id } => format!("user:{}:{}", kind.as_str(), user_id),
            Channel::System { kind } => format!("system:{}", kind.as_str()),
            Channel::Session { session_id } => format!("session:status:{}", session_id),
            Channel::Fleet { fleet_id } => format!("fleet:status:{}", fleet_id),
            Channel::Pipeline {
                pipeline_id,
                run_id,
            } => format!("pipeline:run:{}:{}", pipeline_id, run_id),
        }
    }

    /// Parse a wire-format channel string. Returns `None` on unknown
    /// prefix, missing required id, or malformed suffix — never panics.
    pub fn parse(s: &str) -> Option<Channel> {
        let mut parts = s.split(':');
        let scope = parts.next()?;
        let kind = parts.next()?;
        let rest: Vec<&str> = parts.collect();

        match scope {
            "agent" => {
                let kind = AgentKind::parse(kind)?;
                let agent_id = join_remainder(&rest)?;
                Some(Channel::Agent { kind, agent_id })
            }
            "workspace" => {
                let kind = WorkspaceKind::parse(kind)?;
                let workspace_id = join_remainder(&rest)?;
                Some(Channel::Workspace { kind, workspace_id })
            }
            "user" => {
                let kind = UserKind::parse(kind)?;
                let user_id = join_remainder(&rest)?;
                Some(Channel::User { kind, user_id })
            }
            "system" => {
                let kind = SystemKind::parse(kind)?;
                if !rest.is_empty() {
                    return None;
                }
                Some(Channel::System { kind })
            }
            "session" => {
                if kind != "status" {
                    return None;
                }
                let session_id = join_remainder(&rest)?;
                Some(Channel::Session { session_id })
            }
            "fleet" => {
                if kind != "status" {
                    return None;
                }
                let fleet_id = join_remainder(&rest)?;
                Some(Channel::Fleet { fleet_id })
            }
            "pipeline" => {
                if kind != "run" {
                    return None;
                }
                // exactly two further tokens: pipeline_id, run_id. Neither
                // may themselves contain colons (the type consumes a fixed
                // token count here, nothing is left over as "the remainder").
                if rest.len() != 2 {
                    return None;
                }
                if rest[0].is_empty() || rest[1].is_empty() {
                    return None;
                }
                Some(Channel::Pipeline {
                    pipeline_id: rest[0].to_string(),
                    run_id: rest[1].to_string(),
                })
            }
            _ => None,
        }
    }

    /// Does this channel require explicit client acknowledgment (at-least-once
    /// delivery)? Looked up by channel *type* (scope+kind), not by id — every
    /// `workspace:conflicts:*` channel requires ack regardless of workspace.
    pub fn requires_ack(&self) -> bool {
        matches!(
            self,
            Channel::Workspace {
                kind: WorkspaceKind::Conflicts | WorkspaceKind::Reservations,
                ..
            } | Channel::User {
                kind: UserKind::Notifications,
                ..
            }
        )
    }

    /// Static capacity-table prefix this channel falls under, used by the
    /// ring buffer to pick a capacity (spec.md §4.3).
    pub fn capacity_prefix(&self) -> String {
        match self {
            Channel::Agent { kind, .. } => format!("agent:{}", kind.as_str()),
            Channel::Workspace { kind, .. } => format!("workspace:{}", kind.as_str()),
            Channel::User { kind, .. } => format!("user:{}", kind.as_str()),
            Channel::System { .. } => "system".to_string(),
            Channel::Session { .. } => "session".to_string(),
            Channel::Fleet { .. } => "fleet".to_string(),
            Channel::Pipeline { .. } => "pipeline:run".to_string(),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_id())
    }
}

fn join_remainder(rest: &[&str]) -> Option<String> {
    if rest.is_empty() || rest.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(rest.join(":"))
}

/// `*` matches any run of non-`:` characters within a single colon-delimited
/// segment; every other character is literal. Segment counts must match.
pub fn matches_pattern(channel: &Channel, pattern: &str) -> bool {
    let subject = channel.to_string_id();
    let subject_segments: Vec<&str> = subject.split(':').collect();
    let pattern_segments: Vec<&str> = pattern.split(':').collect();
    if subject_segments.len() != pattern_segments.len() {
        return false;
    }
    subject_segments
        .iter()
        .zip(pattern_segments.iter())
        .all(|(s, p)| segment_matches(s, p))
}

fn segment_matches(segment: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return segment == pattern;
    }
    glob_match(segment.as_bytes(), pattern.as_bytes())
}

fn glob_match(s: &[u8], p: &[u8]) -> bool {
    // Classic two-pointer glob matcher restricted to '*' (no '?').
    let (mut si, mut pi) = (0usize, 0usize);
    let (mut star_pi, mut star_si) = (None, 0usize);
    while si < s.len() {
        if pi < p.len() && (p[pi] == b'*' ) {
            star_pi = Some(pi);
            star_si = si;
            pi += 1;
        } else if pi < p.len() && p[pi] == s[si] {
            si += 1;
            pi += 1;
        } else if let Some(sp) = star_pi {
            pi = sp + 1;
            star_si += 1;
            si = star_si;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<Channel> {
        vec![
            Channel::Agent {
                kind: AgentKind::Output,
                agent_id: "agent-1".to_string(),
            },
            Channel::Agent {
                kind: AgentKind::Output,
                agent_id: "agent:with:colons".to_string(),
            },
            Channel::Workspace {
                kind: WorkspaceKind::Git,
                workspace_id: "ws-abc".to_string(),
            },
            Channel::Workspace {
                kind: WorkspaceKind::Conflicts,
                workspace_id: "w1".to_string(),
            },
            Channel::User {
                kind: UserKind::Mail,
                user_id: "u1".to_string(),
            },
            Channel::User {
                kind: UserKind::Notifications,
                user_id: "u1".to_string(),
            },
            Channel::System {
                kind: SystemKind::Health,
            },
            Channel::System {
                kind: SystemKind::Processes,
            },
            Channel::Session {
                session_id: "sess-1".to_string(),
            },
            Channel::Fleet {
                fleet_id: "fleet-1".to_string(),
            },
            Channel::Pipeline {
                pipeline_id: "pipeA".to_string(),
                run_id: "run42".to_string(),
            },
        ]
    }

    #[test]
    fn round_trip_every_variant() {
        for c in all_variants() {
            let s = c.to_string_id();
            assert_eq!(Channel::parse(&s).as_ref(), Some(&c), "round trip of {s}");
        }
    }

    #[test]
    fn no_tostring_collisions() {
        let variants = all_variants();
        for (i, a) in variants.iter().enumerate() {
            for (j, b) in variants.iter().enumerate() {
                if i != j {
                    assert_ne!(a.to_string_id(), b.to_string_id());
                }
            }
        }
    }

    #[test]
    fn parse_id_with_colons() {
        let parsed = Channel::parse("agent:output:agent:with:colons").unwrap();
        assert_eq!(
            parsed,
            Channel::Agent {
                kind: AgentKind::Output,
                agent_id: "agent:with:colons".to_string(),
            }
        );
        assert_eq!(parsed.to_string_id(), "agent:output:agent:with:colons");
    }

    #[test]
    fn parse_rejects_unknown_prefix() {
        assert_eq!(Channel::parse("bogus:thing:1"), None);
    }

    #[test]
    fn parse_rejects_missing_id() {
        assert_eq!(Channel::parse("agent:output"), None);
        assert_eq!(Channel::parse("workspace:git:"), None);
    }

    #[test]
    fn parse_rejects_system_with_id() {
        assert_eq!(Channel::parse("system:health:extra"), None);
    }

    #[test]
    fn pipeline_requires_exactly_two_ids() {
        assert_eq!(Channel::parse("pipeline:run:pipeA"), None);
        assert_eq!(Channel::parse("pipeline:run:pipeA:run42:extra"), None);
        assert!(Channel::parse("pipeline:run:pipeA:run42").is_some());
    }

    #[test]
    fn requires_ack_matches_spec_list() {
        assert!(Channel::Workspace {
            kind: WorkspaceKind::Conflicts,
            workspace_id: "w1".to_string()
        }
        .requires_ack());
        assert!(Channel::Workspace {
            kind: WorkspaceKind::Reservations,
            workspace_id: "w1".to_string()
        }
        .requires_ack());
        assert!(Channel::User {
            kind: UserKind::Notifications,
            user_id: "u1".to_string()
        }
        .requires_ack());
        assert!(!Channel::User {
            kind: UserKind::Mail,
            user_id: "u1".to_string()
        }
        .requires_ack());
        assert!(!Channel::System {
            kind: SystemKind::Processes
        }
        .requires_ack());
    }

    #[test]
    fn wildcard_matches_single_segment_only() {
        let c = Channel::Agent {
            kind: AgentKind::Output,
            agent_id: "agent-1".to_string(),
        };
        assert!(matches_pattern(&c, "agent:output:*"));
        assert!(matches_pattern(&c, "agent:*:agent-1"));
        assert!(!matches_pattern(&c, "agent:output:agent-1:extra"));
        assert!(!matches_pattern(&c, "workspace:*:*"));
    }
}
