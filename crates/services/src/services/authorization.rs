//! Access decisions for protected resources.
//!
//! Every action maps to a fixed, ordered list of policies. Policies are
//! evaluated in order and the first denial wins. The engine only looks at the
//! facts it is handed; gathering them is the job of the membership resolver.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Verb {
    Read,
    Create,
    Update,
    Delete,
}

impl Verb {
    pub fn is_safe(self) -> bool {
        matches!(self, Verb::Read)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum ResourceKind {
    Project,
    Contributor,
    Issue,
    Comment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action {
    pub resource: ResourceKind,
    pub verb: Verb,
}

impl Action {
    pub const fn new(resource: ResourceKind, verb: Verb) -> Self {
        Self { resource, verb }
    }

    pub fn policies(self) -> &'static [Policy] {
        use Policy::*;
        match (self.resource, self.verb) {
            (ResourceKind::Project, Verb::Create) => &[ProjectMembership],
            (ResourceKind::Project, _) => &[ProjectAuthorOrContributorReadOnly],
            (ResourceKind::Contributor, Verb::Read) => &[ProjectMembership],
            (ResourceKind::Contributor, Verb::Delete) => &[ProtectProjectAuthor, ManageContributors],
            (ResourceKind::Contributor, _) => &[ManageContributors],
            (ResourceKind::Issue | ResourceKind::Comment, _) => {
                &[ProjectMembership, AuthorOrReadOnly]
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    #[error("Authentication credentials were not provided")]
    Unauthenticated,
    #[error("You are not a contributor of this project")]
    NotContributor,
    #[error("Only the author may modify or delete this resource")]
    NotResourceAuthor,
    #[error("Only the project author may perform this action")]
    NotProjectAuthor,
    #[error("The project author cannot be removed from the contributors")]
    ProjectAuthorRemoval,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// What the principal is to the project that owns the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Membership {
    pub is_contributor: bool,
    pub is_project_author: bool,
}

/// Facts about one access attempt.
///
/// `membership` is `None` when no owning project exists yet (project listing
/// and creation). `resource_author` is `None` when the target is a collection
/// or a resource about to be created.
#[derive(Clone, Copy, Debug)]
pub struct AccessRequest {
    pub principal: Option<Uuid>,
    pub action: Action,
    pub membership: Option<Membership>,
    pub resource_author: Option<Uuid>,
    pub target_is_project_author: bool,
}

impl AccessRequest {
    pub fn new(principal: Option<Uuid>, action: Action) -> Self {
        Self {
            principal,
            action,
            membership: None,
            resource_author: None,
            target_is_project_author: false,
        }
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = Some(membership);
        self
    }

    pub fn with_resource_author(mut self, author: Uuid) -> Self {
        self.resource_author = Some(author);
        self
    }

    pub fn targeting_project_author(mut self, is_author: bool) -> Self {
        self.target_is_project_author = is_author;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Policy {
    /// Safe verbs pass; unsafe verbs on an existing resource need its author.
    AuthorOrReadOnly,
    /// Must be authenticated and, once a project scope exists, a contributor.
    ProjectMembership,
    /// Contributors may read; only the project author may write.
    ProjectAuthorOrContributorReadOnly,
    /// Only the project author manages contributor links.
    ManageContributors,
    /// The author's own contributor link is never removable.
    ProtectProjectAuthor,
}

impl Policy {
    pub fn evaluate(self, request: &AccessRequest) -> Decision {
        let Some(principal) = request.principal else {
            return Decision::Deny(DenyReason::Unauthenticated);
        };
        let verb = request.action.verb;

        match self {
            Policy::AuthorOrReadOnly => match request.resource_author {
                _ if verb.is_safe() => Decision::Allow,
                None => Decision::Allow,
                Some(author) if author == principal => Decision::Allow,
                Some(_) => Decision::Deny(DenyReason::NotResourceAuthor),
            },
            Policy::ProjectMembership => match request.membership {
                None => Decision::Allow,
                Some(membership) if membership.is_contributor => Decision::Allow,
                Some(_) => Decision::Deny(DenyReason::NotContributor),
            },
            Policy::ProjectAuthorOrContributorReadOnly => match request.membership {
                // Listing is scoped by the query instead.
                None => Decision::Allow,
                Some(membership) if !membership.is_contributor => {
                    Decision::Deny(DenyReason::NotContributor)
                }
                Some(_) if verb.is_safe() => Decision::Allow,
                Some(membership) if membership.is_project_author => Decision::Allow,
                Some(_) => Decision::Deny(DenyReason::NotProjectAuthor),
            },
            Policy::ManageContributors => match request.membership {
                Some(membership) if membership.is_project_author => Decision::Allow,
                _ => Decision::Deny(DenyReason::NotProjectAuthor),
            },
            Policy::ProtectProjectAuthor => {
                if request.target_is_project_author {
                    Decision::Deny(DenyReason::ProjectAuthorRemoval)
                } else {
                    Decision::Allow
                }
            }
        }
    }
}

/// Runs the action's policies in order, stopping at the first denial.
pub fn authorize(request: &AccessRequest) -> Decision {
    for policy in request.action.policies() {
        let decision = policy.evaluate(request);
        if !decision.is_allowed() {
            tracing::debug!(
                "{} denied {} {}: {:?}",
                policy,
                request.action.verb,
                request.action.resource,
                decision
            );
            return decision;
        }
    }
    Decision::Allow
}
