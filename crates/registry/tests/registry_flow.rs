//! End-to-end registry behavior through the public registration surface.
//!
//! Covered here:
//! - Deduplication by callback identity across multiple registrations
//! - Registration order preservation
//! - Reason, initial, and deletion gating of changing handlers
//! - Field-scope intersection, including the prefix-symmetry property
//! - Finalizer obligations and the excluded-id set
//! - Activity fallback semantics
//! - Sub-handler id composition

#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use reeve_core::{Body, Diff, DiffItem, DiffOperation, FieldPath, Resource};
use reeve_registry::{Activity, ActivityCause, ActivityFn, ChangingFn, HandlerIdSet, ResourceChangingCause};

fn widgets() -> Resource {
    Resource::new("example.com", "v1", "widgets")
}

fn body() -> Body {
    Body::new(json!({
        "metadata": {
            "name": "widget-1",
            "labels": {"app": "demo"},
            "annotations": {"tier": "gold"},
        },
        "spec": {"field": "value"},
    }))
}

fn none_done() -> HandlerIdSet {
    HashSet::new()
}

mod changing {
    use reeve_registry::{
        HandlerOptions, MetaFilter, OperatorRegistry, Reason, ResourceChangingCause,
    };

    use super::*;

    fn update_cause(diff: Diff) -> ResourceChangingCause {
        ResourceChangingCause::new(widgets(), body(), Reason::Update).with_diff(diff)
    }

    fn spec_field_diff() -> Diff {
        let old = json!({"spec": {"field": "old"}});
        let new = json!({"spec": {"field": "new"}});
        Diff::build(Some(&old), Some(&new))
    }

    #[test]
    fn test_same_callback_under_two_conditions_runs_once() {
        let registry = OperatorRegistry::new();
        let action = ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) });

        let action = registry
            .on_update(&widgets(), HandlerOptions::new().with_id("first"), action)
            .unwrap();
        registry
            .on_field(&widgets(), "spec", HandlerOptions::new().with_id("second"), action)
            .unwrap();

        let cause = update_cause(spec_field_diff());
        let registry_handle = registry.changing(&widgets()).unwrap();
        assert_eq!(registry_handle.iter_handlers(&cause, &none_done()).len(), 2);

        let deduplicated = registry.changing_handlers(&cause, &none_done());
        assert_eq!(deduplicated.len(), 1);
        assert_eq!(deduplicated[0].id.as_str(), "first");
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = OperatorRegistry::new();
        for id in ["one", "two", "three"] {
            registry
                .on_update(
                    &widgets(),
                    HandlerOptions::new().with_id(id),
                    ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
                )
                .unwrap();
        }

        let cause = update_cause(spec_field_diff());
        let ids: Vec<_> = registry
            .changing_handlers(&cause, &none_done())
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_reason_gating() {
        let registry = OperatorRegistry::new();
        registry
            .on_create(
                &widgets(),
                HandlerOptions::new().with_id("on-create"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new().with_id("on-update"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_resume(
                &widgets(),
                HandlerOptions::new().with_id("any-reason"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let create = ResourceChangingCause::new(widgets(), body(), Reason::Create)
            .with_initial(true)
            .with_diff(spec_field_diff());
        let ids: Vec<_> = registry
            .changing_handlers(&create, &none_done())
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["on-create", "any-reason"]);

        let update = update_cause(spec_field_diff());
        let ids: Vec<_> = registry
            .changing_handlers(&update, &none_done())
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["on-update"]);
    }

    #[test]
    fn test_initial_handler_skips_non_initial_causes() {
        let registry = OperatorRegistry::new();
        registry
            .on_resume(
                &widgets(),
                HandlerOptions::new().with_id("resume"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let live = update_cause(spec_field_diff());
        assert!(registry.changing_handlers(&live, &none_done()).is_empty());

        let initial = update_cause(spec_field_diff()).with_initial(true);
        assert_eq!(registry.changing_handlers(&initial, &none_done()).len(), 1);
    }

    #[test]
    fn test_initial_handler_needs_deletion_opt_in_for_deleted_objects() {
        let registry = OperatorRegistry::new();
        registry
            .on_resume(
                &widgets(),
                HandlerOptions::new().with_id("plain"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_resume(
                &widgets(),
                HandlerOptions::new().with_id("opted-in").with_deleted(),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let cause = ResourceChangingCause::new(widgets(), body(), Reason::Delete)
            .with_initial(true)
            .with_deleted(true)
            .with_diff(spec_field_diff());
        let ids: Vec<_> = registry
            .changing_handlers(&cause, &none_done())
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["opted-in"]);
    }

    #[test]
    fn test_excluded_ids_are_skipped() {
        let registry = OperatorRegistry::new();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new().with_id("done"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new().with_id("pending"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let mut done = HashSet::new();
        done.insert("done".into());

        let cause = update_cause(spec_field_diff());
        let ids: Vec<_> = registry
            .changing_handlers(&cause, &done)
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["pending"]);
    }

    #[test]
    fn test_field_scope_matches_deeper_and_broader_changes() {
        let registry = OperatorRegistry::new();
        registry
            .on_field(
                &widgets(),
                "spec.tasks",
                HandlerOptions::new().with_id("tasks"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_field(
                &widgets(),
                "spec.tasks.name",
                HandlerOptions::new().with_id("task-name"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_field(
                &widgets(),
                "status",
                HandlerOptions::new().with_id("status"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        // One deep change: seen by the broader scope; the whole-spec change
        // below is seen by the deeper scope. No diff silences all of them.
        let deep = Diff::from_iter([DiffItem::new(
            DiffOperation::Change,
            FieldPath::parse("spec.tasks.name"),
            Some(json!("a")),
            Some(json!("b")),
        )]);
        let ids: Vec<_> = registry
            .changing_handlers(&update_cause(deep), &none_done())
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["tasks/spec.tasks", "task-name/spec.tasks.name"]);

        let broad = Diff::from_iter([DiffItem::new(
            DiffOperation::Change,
            FieldPath::parse("spec"),
            Some(json!({})),
            Some(json!({"tasks": {}})),
        )]);
        let matched = registry.changing_handlers(&update_cause(broad), &none_done());
        assert_eq!(matched.len(), 2);

        assert!(registry
            .changing_handlers(&update_cause(Diff::empty()), &none_done())
            .is_empty());
    }

    #[test]
    fn test_field_scoped_ids_carry_the_path_suffix() {
        let registry = OperatorRegistry::new();
        registry
            .on_field(
                &widgets(),
                "spec.replicas",
                HandlerOptions::new().with_id("scale"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let fields = registry.extra_fields(&widgets());
        assert!(fields.contains(&FieldPath::parse("spec.replicas")));

        let diff = Diff::from_iter([DiffItem::new(
            DiffOperation::Change,
            FieldPath::parse("spec.replicas"),
            Some(json!(1)),
            Some(json!(2)),
        )]);
        let matched = registry.changing_handlers(&update_cause(diff), &none_done());
        assert_eq!(matched[0].id.as_str(), "scale/spec.replicas");
    }

    #[test]
    fn test_label_and_annotation_filters() {
        let registry = OperatorRegistry::new();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new()
                    .with_id("labelled")
                    .with_label("app", MetaFilter::literal("demo"))
                    .with_annotation("tier", MetaFilter::Present),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new()
                    .with_id("excluded-by-label")
                    .with_label("app", MetaFilter::literal("other")),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new()
                    .with_id("wants-absence")
                    .with_label("app", MetaFilter::Absent),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let cause = update_cause(spec_field_diff());
        let ids: Vec<_> = registry
            .changing_handlers(&cause, &none_done())
            .iter()
            .map(|handler| handler.id.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["labelled"]);
    }

    #[test]
    fn test_when_predicate_sees_the_cause() {
        let registry = OperatorRegistry::new();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new()
                    .with_id("only-widget-1")
                    .with_when(|ctx| ctx.body.name() == Some("widget-1")),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let matching = update_cause(spec_field_diff());
        assert_eq!(registry.changing_handlers(&matching, &none_done()).len(), 1);

        let other = ResourceChangingCause::new(
            widgets(),
            Body::new(json!({"metadata": {"name": "widget-2"}})),
            Reason::Update,
        )
        .with_diff(spec_field_diff());
        assert!(registry.changing_handlers(&other, &none_done()).is_empty());
    }

    #[tokio::test]
    async fn test_returned_handlers_are_callable() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&counter);

        let registry = OperatorRegistry::new();
        registry
            .on_update(
                &widgets(),
                HandlerOptions::new().with_id("count"),
                ChangingFn::new(move |cause: ResourceChangingCause| {
                    let seen = Arc::clone(&seen);
                    async move {
                        assert_eq!(cause.reason, Reason::Update);
                        seen.fetch_add(1, Ordering::SeqCst);
                        Ok(Some(json!({"handled": true})))
                    }
                }),
            )
            .unwrap();

        let cause = update_cause(spec_field_diff());
        for handler in registry.changing_handlers(&cause, &none_done()) {
            let outcome = handler.action.call(cause.clone()).await.unwrap();
            assert_eq!(outcome, Some(json!({"handled": true})));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

mod finalizers {
    use reeve_registry::{HandlerOptions, MetaFilter, OperatorRegistry, ResourceSpawningCause};

    use super::*;

    fn spawning_cause() -> ResourceSpawningCause {
        ResourceSpawningCause::new(widgets(), body())
    }

    #[test]
    fn test_empty_registry_requires_nothing() {
        let registry = OperatorRegistry::new();
        assert!(!registry.requires_finalizer(&spawning_cause(), &none_done()));
    }

    #[test]
    fn test_deletion_handler_obligates_a_finalizer() {
        let registry = OperatorRegistry::new();
        registry
            .on_delete(
                &widgets(),
                HandlerOptions::new().with_id("cleanup"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        assert!(registry.requires_finalizer(&spawning_cause(), &none_done()));
    }

    #[test]
    fn test_optional_deletion_handler_does_not() {
        let registry = OperatorRegistry::new();
        registry
            .on_delete(
                &widgets(),
                HandlerOptions::new().with_id("best-effort").optional(),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        assert!(!registry.requires_finalizer(&spawning_cause(), &none_done()));
    }

    #[test]
    fn test_excluded_handler_releases_the_obligation() {
        let registry = OperatorRegistry::new();
        registry
            .on_delete(
                &widgets(),
                HandlerOptions::new().with_id("cleanup"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let mut done = HashSet::new();
        done.insert("cleanup".into());
        assert!(!registry.requires_finalizer(&spawning_cause(), &done));
    }

    #[test]
    fn test_non_matching_filters_release_the_obligation() {
        let registry = OperatorRegistry::new();
        registry
            .on_delete(
                &widgets(),
                HandlerOptions::new()
                    .with_id("filtered")
                    .with_label("app", MetaFilter::literal("other")),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        assert!(!registry.requires_finalizer(&spawning_cause(), &none_done()));
    }

    #[test]
    fn test_field_scoped_deletion_handler_still_obligates() {
        // Finalizer decisions happen before any change exists, so field
        // scopes are ignored for them.
        let registry = OperatorRegistry::new();
        registry
            .on_field(
                &widgets(),
                "spec.data",
                HandlerOptions::new().with_id("scoped"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_delete(
                &widgets(),
                HandlerOptions::new().with_id("cleanup"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        assert!(registry.requires_finalizer(&spawning_cause(), &none_done()));
    }
}

mod activities {
    use reeve_registry::{ErrorsMode, HandlerOptions, OperatorRegistry};

    use super::*;

    fn auth_cause() -> ActivityCause {
        ActivityCause::new(Activity::Authentication)
    }

    #[test]
    fn test_regular_login_beats_fallbacks() {
        let registry = OperatorRegistry::with_fallback_logins([ActivityFn::named(
            "builtin-login",
            |_cause: ActivityCause| async { Ok(None) },
        )])
        .unwrap();

        let handlers = registry.activity_handlers(&auth_cause(), &none_done());
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].id.as_str(), "builtin-login");
        assert!(handlers[0].fallback);
        assert_eq!(handlers[0].errors, Some(ErrorsMode::Ignored));

        registry
            .on_activity(
                Some(Activity::Authentication),
                HandlerOptions::new().with_id("custom-login"),
                ActivityFn::new(|_cause: ActivityCause| async { Ok(None) }),
            )
            .unwrap();

        let handlers = registry.activity_handlers(&auth_cause(), &none_done());
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].id.as_str(), "custom-login");
        assert!(!handlers[0].fallback);
    }

    #[test]
    fn test_unscoped_activity_handler_serves_every_phase() {
        let registry = OperatorRegistry::new();
        registry
            .on_activity(
                None,
                HandlerOptions::new().with_id("always"),
                ActivityFn::new(|_cause: ActivityCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_activity(
                Some(Activity::Probe),
                HandlerOptions::new().with_id("probe-only"),
                ActivityFn::new(|_cause: ActivityCause| async { Ok(None) }),
            )
            .unwrap();

        let startup = registry
            .activity_handlers(&ActivityCause::new(Activity::Startup), &none_done());
        assert_eq!(startup.len(), 1);
        assert_eq!(startup[0].id.as_str(), "always");

        let probe = registry.activity_handlers(&ActivityCause::new(Activity::Probe), &none_done());
        assert_eq!(probe.len(), 2);
    }

    #[test]
    fn test_same_login_wrapped_once_deduplicates() {
        let registry = OperatorRegistry::new();
        let login = ActivityFn::named("login", |_cause: ActivityCause| async { Ok(None) });

        let login = registry
            .on_activity(Some(Activity::Authentication), HandlerOptions::new(), login)
            .unwrap();
        registry
            .on_activity(None, HandlerOptions::new().with_id("login-anywhere"), login)
            .unwrap();

        let handlers = registry.activity_handlers(&auth_cause(), &none_done());
        assert_eq!(handlers.len(), 1);
    }
}

mod watching {
    use reeve_registry::{
        HandlerOptions, OperatorRegistry, ResourceWatchingCause, WatchEventType, WatchingFn,
    };

    use super::*;

    #[test]
    fn test_raw_events_need_no_diff() {
        let registry = OperatorRegistry::new();
        registry
            .on_event(
                &widgets(),
                HandlerOptions::new().with_id("log-everything"),
                WatchingFn::new(|_cause: ResourceWatchingCause| async { Ok(None) }),
            )
            .unwrap();

        let cause = ResourceWatchingCause::new(widgets(), body(), WatchEventType::Modified);
        assert_eq!(registry.watching_handlers(&cause, &none_done()).len(), 1);
    }

    #[test]
    fn test_resources_lists_every_registered_kind() {
        let registry = OperatorRegistry::new();
        let gadgets = Resource::new("example.com", "v1", "gadgets");
        registry
            .on_event(
                &widgets(),
                HandlerOptions::new().with_id("w"),
                WatchingFn::new(|_cause: ResourceWatchingCause| async { Ok(None) }),
            )
            .unwrap();
        registry
            .on_update(
                &gadgets,
                HandlerOptions::new().with_id("g"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let resources = registry.resources();
        assert_eq!(resources.len(), 2);
        assert!(resources.contains(&widgets()));
        assert!(resources.contains(&gadgets));
    }
}

mod sub_handlers {
    use reeve_registry::{HandlerOptions, Reason, ResourceChangingCause, SubRegistry};

    use super::*;

    #[test]
    fn test_sub_handler_ids_are_namespaced_under_the_parent() {
        let sub = SubRegistry::new("parent-task".into());
        sub.register(
            HandlerOptions::new().with_id("step-one"),
            ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
        )
        .unwrap();

        let cause = ResourceChangingCause::new(widgets(), body(), Reason::Update);
        let handlers = sub.registry().get_handlers(&cause, &none_done());
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].id.as_str(), "parent-task/step-one");
    }

    #[test]
    fn test_completed_sub_handlers_are_not_returned_again() {
        let sub = SubRegistry::new("parent-task".into());
        for id in ["a", "b"] {
            sub.register(
                HandlerOptions::new().with_id(id),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();
        }

        let mut done = HashSet::new();
        done.insert("parent-task/a".into());

        let cause = ResourceChangingCause::new(widgets(), body(), Reason::Update);
        let handlers = sub.registry().get_handlers(&cause, &done);
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].id.as_str(), "parent-task/b");
    }
}

// ==========================================================================
// PROPERTY: field-scope intersection is symmetric under prefix containment
// ==========================================================================

fn segments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-c]{1,2}", 0..4)
}

proptest! {
    #[test]
    fn prop_field_scope_matching_is_prefix_symmetric(
        scope in segments(),
        changed in segments(),
    ) {
        use reeve_registry::{HandlerOptions, OperatorRegistry, Reason, ResourceChangingCause};

        let scope_path: FieldPath = scope.iter().cloned().collect();
        let changed_path: FieldPath = changed.iter().cloned().collect();

        let registry = OperatorRegistry::new();
        registry
            .on_field(
                &widgets(),
                &scope_path.to_string(),
                HandlerOptions::new().with_id("scoped"),
                ChangingFn::new(|_cause: ResourceChangingCause| async { Ok(None) }),
            )
            .unwrap();

        let diff = Diff::from_iter([DiffItem::new(
            DiffOperation::Change,
            changed_path.clone(),
            Some(json!(1)),
            Some(json!(2)),
        )]);
        let cause = ResourceChangingCause::new(widgets(), body(), Reason::Update).with_diff(diff);
        let matched = !registry.changing_handlers(&cause, &none_done()).is_empty();

        // A root scope is stored as "no scope" and matches any change.
        let expected = scope_path.is_root()
            || changed_path.starts_with(&scope_path)
            || scope_path.starts_with(&changed_path);
        prop_assert_eq!(matched, expected);
    }
}
