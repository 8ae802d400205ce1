//! Discussion threads on any note-able resource.
//!
//! [`DiscussionManager`] gives issues, merge requests, epics, snippets and
//! commits one interface. Capabilities only some resources have are exposed
//! as views: [`Resolvable`] for merge requests, [`Positioned`] for merge
//! requests and commits.

use glbridge_core::api::{DiscussionsService, NewDiscussion, Position};
use glbridge_core::paginate::{collect_all, paginate, ListOptions};
use glbridge_core::types::{Discussion, Note};
use glbridge_core::{Error, Id, Noteable, Result, ResultExt};

/// Resource kinds accepted by the discussion tools.
pub const RESOURCE_TYPES: &[&str] = &["issue", "merge_request", "epic", "snippet", "commit"];

pub struct DiscussionManager<'a> {
    service: &'a dyn DiscussionsService,
    target: Noteable,
}

impl<'a> DiscussionManager<'a> {
    /// Manage the discussions of `target`.
    ///
    /// Rejects zero parents and zero or empty resource identifiers. Merge
    /// requests accept a zero parent.
    pub fn new(service: &'a dyn DiscussionsService, target: Noteable) -> Result<Self> {
        let (parent, resource_missing) = match &target {
            Noteable::Issue { project, iid } => (Some(project), *iid == 0),
            Noteable::MergeRequest { iid, .. } => (None, *iid == 0),
            Noteable::Epic { group, epic_id } => (Some(group), *epic_id == 0),
            Noteable::Snippet {
                project,
                snippet_id,
            } => (Some(project), *snippet_id == 0),
            Noteable::Commit { project, sha } => (Some(project), sha.trim().is_empty()),
        };

        if parent.is_some_and(Id::is_zero) {
            return Err(Error::InvalidArgument(format!(
                "{} discussions need a parent ID",
                target.kind()
            )));
        }
        if resource_missing {
            return Err(Error::InvalidArgument(format!(
                "{} discussions need a resource ID",
                target.kind()
            )));
        }

        Ok(Self { service, target })
    }

    /// Build a manager from the `resource_type` / `parent_id` /
    /// `resource_id` tool arguments.
    pub fn for_resource(
        service: &'a dyn DiscussionsService,
        kind: &str,
        parent: Id,
        resource_id: &str,
    ) -> Result<Self> {
        let resource_id = resource_id.trim();
        let number = || -> Result<u64> {
            resource_id.parse::<u64>().map_err(|_| {
                Error::InvalidArgument(format!(
                    "{} ID must be a positive integer, got {:?}",
                    kind, resource_id
                ))
            })
        };

        let target = match kind {
            "issue" => Noteable::Issue {
                project: parent,
                iid: number()?,
            },
            "merge_request" => Noteable::MergeRequest {
                project: parent,
                iid: number()?,
            },
            "epic" => Noteable::Epic {
                group: parent,
                epic_id: number()?,
            },
            "snippet" => Noteable::Snippet {
                project: parent,
                snippet_id: number()?,
            },
            "commit" => Noteable::Commit {
                project: parent,
                sha: resource_id.to_string(),
            },
            other => {
                return Err(Error::InvalidArgument(format!(
                    "unsupported resource type {:?}",
                    other
                )))
            }
        };

        Self::new(service, target)
    }

    pub fn target(&self) -> &Noteable {
        &self.target
    }

    /// Every discussion of the resource. Internal notes are dropped unless
    /// `include_confidential` is set.
    pub async fn list(&self, include_confidential: bool) -> Result<Vec<Discussion>> {
        let service = self.service;
        let target = &self.target;

        let pages = paginate(ListOptions::max_page(), move |opts| async move {
            service.list_discussions(target, opts).await
        });
        let discussions = collect_all(pages)
            .await
            .with_context(|| format!("list discussions of {}", self.target))?;

        Ok(filter_internal(discussions, include_confidential))
    }

    pub async fn new_discussion(&self, body: &str) -> Result<Discussion> {
        let new = NewDiscussion {
            body: body.to_string(),
            ..Default::default()
        };
        self.service
            .create_discussion(&self.target, new)
            .await
            .with_context(|| format!("create discussion on {}", self.target))
    }

    pub async fn add_note(&self, discussion_id: &str, body: &str) -> Result<Note> {
        self.service
            .add_note(&self.target, discussion_id, body)
            .await
            .with_context(|| format!("add note to discussion {} of {}", discussion_id, self.target))
    }

    pub async fn modify_note(&self, discussion_id: &str, note_id: u64, body: &str) -> Result<Note> {
        self.service
            .update_note(&self.target, discussion_id, note_id, body)
            .await
            .with_context(|| format!("modify note {} of {}", note_id, self.target))
    }

    pub async fn delete_note(&self, discussion_id: &str, note_id: u64) -> Result<()> {
        self.service
            .delete_note(&self.target, discussion_id, note_id)
            .await
            .with_context(|| format!("delete note {} of {}", note_id, self.target))
    }

    /// Resolution support, merge requests only.
    pub fn resolvable(&self) -> Option<Resolvable<'_>> {
        match &self.target {
            Noteable::MergeRequest { project, iid } => Some(Resolvable {
                service: self.service,
                project,
                iid: *iid,
            }),
            _ => None,
        }
    }

    /// Diff-anchored discussions, merge requests and commits only.
    pub fn positioned(&self) -> Option<Positioned<'_>> {
        match &self.target {
            Noteable::MergeRequest { .. } | Noteable::Commit { .. } => Some(Positioned {
                service: self.service,
                target: &self.target,
            }),
            _ => None,
        }
    }
}

pub struct Resolvable<'m> {
    service: &'m dyn DiscussionsService,
    project: &'m Id,
    iid: u64,
}

impl Resolvable<'_> {
    pub async fn resolve(&self, discussion_id: &str, resolved: bool) -> Result<Discussion> {
        self.service
            .resolve_discussion(self.project, self.iid, discussion_id, resolved)
            .await
            .with_context(|| {
                format!(
                    "resolve discussion {} of merge request {}!{}",
                    discussion_id, self.project, self.iid
                )
            })
    }
}

pub struct Positioned<'m> {
    service: &'m dyn DiscussionsService,
    target: &'m Noteable,
}

impl Positioned<'_> {
    /// Open a discussion anchored at `position`. Commit discussions ignore
    /// `commit_id`.
    pub async fn new_position_discussion(
        &self,
        body: &str,
        position: Position,
        commit_id: Option<String>,
    ) -> Result<Discussion> {
        let commit_id = match self.target {
            Noteable::Commit { .. } => None,
            _ => commit_id,
        };
        let new = NewDiscussion {
            body: body.to_string(),
            position: Some(position),
            commit_id,
        };
        self.service
            .create_discussion(self.target, new)
            .await
            .with_context(|| format!("create positioned discussion on {}", self.target))
    }
}

/// Drop internal notes, then discussions left without notes.
pub fn filter_internal(discussions: Vec<Discussion>, include_confidential: bool) -> Vec<Discussion> {
    if include_confidential {
        return discussions;
    }

    discussions
        .into_iter()
        .filter_map(|mut discussion| {
            discussion.notes.retain(|note| !note.internal);
            (!discussion.notes.is_empty()).then_some(discussion)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glbridge_core::api::MockDiscussionsService;
    use glbridge_core::Page;

    fn note(id: u64, internal: bool) -> Note {
        Note {
            id,
            body: format!("note {}", id),
            internal,
            ..Default::default()
        }
    }

    fn discussion(id: &str, notes: Vec<Note>) -> Discussion {
        Discussion {
            id: id.to_string(),
            notes,
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_drops_internal_notes() {
        let input = vec![
            discussion("a", vec![note(1, false), note(2, true)]),
            discussion("b", vec![note(3, true)]),
            discussion("c", vec![]),
        ];

        let filtered = filter_internal(input.clone(), false);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a");
        assert_eq!(filtered[0].notes, vec![note(1, false)]);

        assert_eq!(filter_internal(input.clone(), true), input);
    }

    #[test]
    fn test_constructor_validation() {
        let service = MockDiscussionsService::new();

        let zero_parent = DiscussionManager::for_resource(&service, "issue", Id::Int(0), "3");
        assert!(matches!(zero_parent, Err(Error::InvalidArgument(_))));

        let zero_iid = DiscussionManager::for_resource(&service, "epic", Id::parse("g"), "0");
        assert!(matches!(zero_iid, Err(Error::InvalidArgument(_))));

        let empty_sha = DiscussionManager::for_resource(&service, "commit", Id::parse("g/p"), " ");
        assert!(matches!(empty_sha, Err(Error::InvalidArgument(_))));

        let bad_number = DiscussionManager::for_resource(&service, "snippet", Id::parse("g/p"), "x");
        assert!(matches!(bad_number, Err(Error::InvalidArgument(_))));

        let unknown = DiscussionManager::for_resource(&service, "wiki", Id::parse("g/p"), "1");
        assert!(matches!(unknown, Err(Error::InvalidArgument(_))));

        // Merge requests tolerate a missing parent
        let mr = DiscussionManager::for_resource(&service, "merge_request", Id::default(), "4");
        assert!(mr.is_ok());
    }

    #[test]
    fn test_capabilities_by_kind() {
        let service = MockDiscussionsService::new();
        let project = Id::parse("g/p");

        let issue = DiscussionManager::for_resource(&service, "issue", project.clone(), "1").unwrap();
        assert!(issue.resolvable().is_none());
        assert!(issue.positioned().is_none());

        let mr =
            DiscussionManager::for_resource(&service, "merge_request", project.clone(), "1").unwrap();
        assert!(mr.resolvable().is_some());
        assert!(mr.positioned().is_some());

        let commit = DiscussionManager::for_resource(&service, "commit", project, "abc").unwrap();
        assert!(commit.resolvable().is_none());
        assert!(commit.positioned().is_some());
    }

    #[tokio::test]
    async fn test_list_walks_all_pages_before_filtering() {
        let mut service = MockDiscussionsService::new();
        service
            .expect_list_discussions()
            .times(2)
            .returning(|_, opts| {
                assert_eq!(opts.per_page, 100);
                if opts.page <= 1 {
                    Ok(Page::new(vec![discussion("a", vec![note(1, true)])], 2))
                } else {
                    Ok(Page::last(vec![discussion("b", vec![note(2, false)])]))
                }
            });

        let manager =
            DiscussionManager::for_resource(&service, "issue", Id::parse("g/p"), "9").unwrap();
        let discussions = manager.list(false).await.unwrap();

        assert_eq!(discussions.len(), 1);
        assert_eq!(discussions[0].id, "b");
    }

    #[tokio::test]
    async fn test_commit_position_ignores_commit_id() {
        let mut service = MockDiscussionsService::new();
        service
            .expect_create_discussion()
            .withf(|target, new| {
                matches!(target, Noteable::Commit { sha, .. } if sha == "abc")
                    && new.commit_id.is_none()
                    && new.position.is_some()
            })
            .times(1)
            .returning(|_, _| Ok(discussion("d", vec![])));

        let manager =
            DiscussionManager::for_resource(&service, "commit", Id::parse("g/p"), "abc").unwrap();
        let created = manager
            .positioned()
            .unwrap()
            .new_position_discussion("looks off", Position::default(), Some("ffff".into()))
            .await
            .unwrap();
        assert_eq!(created.id, "d");
    }

    #[tokio::test]
    async fn test_upstream_error_carries_context() {
        let mut service = MockDiscussionsService::new();
        service
            .expect_delete_note()
            .returning(|_, _, _| Err(Error::NotFound("note".into())));

        let manager =
            DiscussionManager::for_resource(&service, "issue", Id::parse("g/p"), "2").unwrap();
        let err = manager.delete_note("abc", 5).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "delete note 5 of issue g/p#2: Not found: note"
        );
    }
}
