use super::support::*;
use plume::{CommentBody, models::COMMENT_TOMBSTONE};

#[tokio::test]
async fn comment_then_delete_scenario() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 0);

    let comment = blog.create_comment(&u, &post, "hi", None).await.expect("create");
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 1);

    blog.soft_delete_comment(&u, &comment.id).await.expect("delete");
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 0);

    let stored = blog.get_comment(&comment.id).await.expect("record kept");
    assert!(stored.is_deleted());
    assert_eq!(stored.body, CommentBody::Deleted);
    assert_eq!(stored.body.text(), COMMENT_TOMBSTONE);
}

#[tokio::test]
async fn second_delete_is_not_found_and_counts_once() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    let keep = blog.create_comment(&u, &post, "stays", None).await.unwrap();
    let gone = blog.create_comment(&u, &post, "goes", None).await.unwrap();

    blog.soft_delete_comment(&u, &gone.id).await.unwrap();
    let err = blog.soft_delete_comment(&u, &gone.id).await.unwrap_err();
    assert!(matches!(err, EngageError::NotFound { entity: EntityKind::Comment, .. }));
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 1);
    assert!(!blog.get_comment(&keep.id).await.unwrap().is_deleted());
}

#[tokio::test]
async fn reply_across_posts_is_rejected() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let p1 = write_post(&mut blog, &u, PostStatus::Published).await;
    let p2 = write_post(&mut blog, &u, PostStatus::Published).await;
    let c1 = blog.create_comment(&u, &p1, "on p1", None).await.unwrap();

    let err = blog.create_comment(&u, &p2, "reply", Some(&c1.id)).await.unwrap_err();
    assert!(matches!(
        err,
        EngageError::InvalidState {
            reason: StateViolation::CrossPostReply,
            ..
        }
    ));
    assert_eq!(blog.get_post(&p2).await.unwrap().comments_count, 0);
    assert!(blog.get_comment(&c1.id).await.unwrap().replies.is_empty());
}

#[tokio::test]
async fn replies_keep_creation_order() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let v = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    let root = blog.create_comment(&u, &post, "root", None).await.unwrap();

    let mut expected = Vec::new();
    for (i, author) in [&u, &v, &u, &v].into_iter().enumerate() {
        let reply = blog
            .create_comment(author, &post, &format!("reply {i}"), Some(&root.id))
            .await
            .unwrap();
        expected.push(reply.id);
    }

    let thread = blog.comment_thread(&root.id).await.unwrap();
    assert_eq!(thread.comment.replies, expected);
    let texts: Vec<&str> = thread.replies.iter().map(|reply| reply.body.text()).collect();
    assert_eq!(texts, vec!["reply 0", "reply 1", "reply 2", "reply 3"]);

    // A deleted reply keeps its place.
    blog.soft_delete_comment(&v, &expected[1]).await.unwrap();
    let thread = blog.comment_thread(&root.id).await.unwrap();
    assert_eq!(thread.comment.replies, expected);
    assert!(thread.replies[1].is_deleted());
}

#[tokio::test]
async fn comment_count_tracks_live_comments() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;

    let mut ids = Vec::new();
    for i in 0..6 {
        let parent = if i % 2 == 1 { ids.last().cloned() } else { None };
        let comment = blog
            .create_comment(&u, &post, &format!("comment {i}"), parent.as_deref())
            .await
            .unwrap();
        ids.push(comment.id);
    }
    for id in [&ids[0], &ids[3], &ids[4]] {
        blog.soft_delete_comment(&u, id).await.unwrap();
    }

    let post_doc = blog.get_post(&post).await.unwrap();
    let mut live = 0;
    for id in &ids {
        if !blog.get_comment(id).await.unwrap().is_deleted() {
            live += 1;
        }
    }
    assert_eq!(post_doc.comments_count, live);
    assert_eq!(live, 3);
}

#[tokio::test]
async fn only_the_author_edits_or_deletes() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let v = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    let comment = blog.create_comment(&u, &post, "mine", None).await.unwrap();

    let err = blog.update_comment(&v, &comment.id, "yours").await.unwrap_err();
    assert!(matches!(err, EngageError::Authorization { .. }));
    let err = blog.soft_delete_comment(&v, &comment.id).await.unwrap_err();
    assert!(matches!(err, EngageError::Authorization { .. }));
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 1);
}

#[tokio::test]
async fn listing_returns_threads_and_survives_far_pages() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    let root = blog.create_comment(&u, &post, "root", None).await.unwrap();
    let reply = blog.create_comment(&u, &post, "reply", Some(&root.id)).await.unwrap();

    let first = blog.post_comments(&post, 1, 10).await.unwrap();
    assert_eq!(first.total, 1);
    assert_eq!(first.items[0].comment.id, root.id);
    assert_eq!(first.items[0].replies.len(), 1);
    assert_eq!(first.items[0].replies[0].id, reply.id);

    let far = blog.post_comments(&post, u64::MAX, 0).await.unwrap();
    assert!(far.items.is_empty());
    assert_eq!(far.total, 1);
}

#[tokio::test]
async fn comments_of_a_deleted_post_are_not_found() {
    let mut blog = memory_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;
    let comment = blog.create_comment(&u, &post, "orphaned soon", None).await.unwrap();
    blog.delete_post(&u, &post).await.unwrap();

    assert!(blog.post_comments(&post, 1, 10).await.unwrap_err().is_not_found());
    assert!(blog.comment_thread(&comment.id).await.unwrap_err().is_not_found());
    assert!(blog.create_comment(&u, &post, "late", None).await.unwrap_err().is_not_found());
    assert!(blog.soft_delete_comment(&u, &comment.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn failed_counter_after_insert_is_partial_failure() {
    let mut blog = faulty_blog();
    let u = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &u, PostStatus::Published).await;

    blog.executor_mut().fail_on = Some(format!("posts:{post}.comments_count"));
    let err = blog.create_comment(&u, &post, "hello", None).await.unwrap_err();
    assert_eq!(err.kind(), "partial_failure");
    assert_eq!(blog.get_post(&post).await.unwrap().comments_count, 0);

    let report = blog.audit_post(&post).await.unwrap();
    assert!(!report.is_consistent());
    let repaired = blog.recount_post(&post).await.unwrap();
    assert_eq!(repaired.comments_count, 1);
}
