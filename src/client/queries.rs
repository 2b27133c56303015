//! GraphQL documents sent to the platform. Each has a distinct operation name.

pub const USER_PROFILE: &str = r#"
query UserProfile {
  user {
    id
    login
    attrs
    createdAt
  }
}
"#;

pub const XP_TRANSACTIONS: &str = r#"
query XpTransactions($eventId: Int!) {
  transaction(
    where: { type: { _eq: "xp" }, eventId: { _eq: $eventId } }
    order_by: { createdAt: asc }
  ) {
    id
    type
    amount
    createdAt
    path
    objectId
  }
}
"#;

pub const AUDIT_TRANSACTIONS: &str = r#"
query AuditTransactions {
  transaction(
    where: { type: { _in: ["up", "down"] } }
    order_by: { createdAt: desc }
  ) {
    id
    type
    amount
    createdAt
    path
  }
}
"#;

pub const SKILL_TRANSACTIONS: &str = r#"
query SkillTransactions {
  transaction(
    where: { type: { _like: "skill_%" } }
    order_by: { createdAt: asc }
  ) {
    id
    type
    amount
    createdAt
    path
  }
}
"#;

pub const COMPLETED_PROJECTS: &str = r#"
query CompletedProjects($eventId: Int!) {
  progress(
    where: {
      eventId: { _eq: $eventId }
      grade: { _gt: 0 }
      object: { type: { _eq: "project" } }
    }
    order_by: { createdAt: desc }
  ) {
    id
    objectId
    grade
    createdAt
    path
    isDone
    object { id name type }
  }
}
"#;

pub const PENDING_PROJECTS: &str = r#"
query PendingProjects($eventId: Int!) {
  progress(
    where: {
      eventId: { _eq: $eventId }
      grade: { _is_null: true }
      object: { type: { _eq: "project" } }
    }
    order_by: { createdAt: asc }
  ) {
    id
    objectId
    grade
    createdAt
    path
    isDone
    object { id name type }
  }
}
"#;

/// Operation name of a document, e.g. `"XpTransactions"`.
pub fn operation_name(query: &str) -> Option<&str> {
    let rest = query.trim_start().strip_prefix("query")?.trim_start();
    let end = rest.find(|c: char| !(c.is_alphanumeric() || c == '_')).unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}
