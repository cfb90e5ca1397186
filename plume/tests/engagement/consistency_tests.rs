use super::support::*;
use plume::{
    Drift,
    runtime::commands::{DocumentPatch, FieldAssignment},
};

async fn overwrite<E: MutationExecutor>(blog: &mut Blog<E>, kind: EntityKind, id: &str, field: &str, value: Value) {
    let command = MutationCommand::PatchDocument(DocumentPatch {
        key: blog.keys().entity(kind.collection(), id),
        collection: kind.collection().to_string(),
        entity_id: id.to_string(),
        guards: Vec::new(),
        assign: vec![FieldAssignment {
            path: field.to_string(),
            value,
        }],
    });
    blog.executor_mut().execute(&command).await.expect("overwrite field");
}

#[tokio::test]
async fn partial_follow_is_found_and_reconciled() {
    let mut blog = faulty_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;

    blog.executor_mut().fail_on = Some(format!("users:{b}.followers"));
    assert!(blog.toggle_follow(&a, &b).await.is_err());

    let report = blog.audit_user(&a).await.unwrap();
    assert_eq!(
        report.drift,
        vec![Drift::MissingReverse {
            field: "followers".to_string(),
            other: EntityKind::User,
            other_id: b.clone(),
        }]
    );

    let outcome = blog.reconcile_follow(&a, &b).await.unwrap();
    assert!(outcome.is_following);
    assert_eq!((outcome.followers_count, outcome.following_count), (1, 1));
    assert!(blog.audit_user(&a).await.unwrap().is_consistent());
    assert!(blog.audit_user(&b).await.unwrap().is_consistent());

    // Reconciling again changes nothing.
    assert_eq!(blog.reconcile_follow(&a, &b).await.unwrap(), outcome);
}

#[tokio::test]
async fn reconcile_removes_a_stale_follower() {
    let mut blog = memory_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;
    blog.toggle_follow(&a, &b).await.unwrap();
    overwrite(&mut blog, EntityKind::User, &a, "following", Value::Array(Vec::new())).await;

    let outcome = blog.reconcile_follow(&a, &b).await.unwrap();
    assert!(!outcome.is_following);
    assert_eq!(outcome.followers_count, 0);
    assert_eq!(outcome.following_count, 0);
    assert!(blog.get_user(&b).await.unwrap().followers.is_empty());
}

#[tokio::test]
async fn next_toggle_corrects_a_drifted_counter() {
    let mut blog = memory_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;
    overwrite(&mut blog, EntityKind::User, &b, "followers_count", Value::from(41)).await;

    let outcome = blog.toggle_follow(&a, &b).await.unwrap();
    assert_eq!(outcome.followers_count, 1);
}

#[tokio::test]
async fn duplicate_likes_are_reported_and_removed() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &author, PostStatus::Published).await;
    blog.toggle_post_like(&reader, &post).await.unwrap();

    let like = serde_json::to_value(&blog.get_post(&post).await.unwrap().likes[0]).unwrap();
    overwrite(&mut blog, EntityKind::Post, &post, "likes", Value::Array(vec![like.clone(), like])).await;

    let report = blog.audit_post(&post).await.unwrap();
    assert!(report.drift.contains(&Drift::DuplicateMember {
        field: "likes".to_string(),
        member: reader.clone(),
    }));
    assert!(report.drift.contains(&Drift::CountMismatch {
        field: "likes_count".to_string(),
        stored: 1,
        actual: 2,
    }));

    let repaired = blog.recount_post(&post).await.unwrap();
    assert_eq!(repaired.likes.len(), 1);
    assert_eq!(repaired.likes_count, 1);
    assert!(blog.audit_post(&post).await.unwrap().is_consistent());
}

#[tokio::test]
async fn comment_audit_checks_replies_and_likes() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    let root = blog.create_comment(&u, &post, "root", None).await.unwrap();
    blog.create_comment(&u, &post, "reply", Some(&root.id)).await.unwrap();
    blog.toggle_comment_like(&u, &root.id).await.unwrap();
    assert!(blog.audit_comment(&root.id).await.unwrap().is_consistent());

    overwrite(&mut blog, EntityKind::Comment, &root.id, "likes_count", Value::from(3)).await;
    let report = blog.audit_comment(&root.id).await.unwrap();
    assert_eq!(report.drift.len(), 1);
    assert_eq!(blog.recount_comment(&root.id).await.unwrap().likes_count, 1);
}
