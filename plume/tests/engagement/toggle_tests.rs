use super::support::*;

#[tokio::test]
async fn follow_unfollow_scenario() {
    let mut blog = memory_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;

    let followed = blog.toggle_follow(&a, &b).await.expect("follow");
    assert!(followed.is_following);
    assert_eq!((followed.followers_count, followed.following_count), (1, 1));

    let unfollowed = blog.toggle_follow(&a, &b).await.expect("unfollow");
    assert!(!unfollowed.is_following);
    assert_eq!((unfollowed.followers_count, unfollowed.following_count), (0, 0));
}

#[tokio::test]
async fn even_toggles_restore_and_odd_toggles_flip() {
    let mut blog = memory_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &b, PostStatus::Published).await;

    for round in 1..=5 {
        let follow = blog.toggle_follow(&a, &b).await.expect("follow toggle");
        let like = blog.toggle_post_like(&a, &post).await.expect("like toggle");
        let odd = round % 2 == 1;
        assert_eq!(follow.is_following, odd, "round {round}");
        assert_eq!(like.is_liked, odd, "round {round}");
        assert_eq!(follow.followers_count, i64::from(odd));
        assert_eq!(like.likes_count, i64::from(odd));
    }

    let b_user = blog.get_user(&b).await.unwrap();
    assert!(b_user.is_followed_by(&a));
    assert_eq!(blog.get_user(&a).await.unwrap().liked_posts, vec![post]);
}

#[tokio::test]
async fn self_follow_always_fails() {
    let mut blog = memory_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;

    for _ in 0..2 {
        let err = blog.toggle_follow(&a, &a).await.unwrap_err();
        assert!(matches!(err, EngageError::SelfReference { ref user_id } if user_id == &a));
        blog.toggle_follow(&b, &a).await.expect("other follow");
    }
    let user = blog.get_user(&a).await.unwrap();
    assert!(user.following.is_empty());
    assert_eq!(user.following_count, 0);
}

#[tokio::test]
async fn counters_match_cardinality_after_mixed_toggles() {
    let mut blog = memory_blog();
    let mut users = Vec::new();
    for name in ["alice", "bobby", "carol", "danny"] {
        users.push(register(&mut blog, name).await);
    }
    let post = write_post(&mut blog, &users[0], PostStatus::Published).await;
    let comment = blog
        .create_comment(&users[1], &post, "first!", None)
        .await
        .expect("comment");

    let pairs = [(0, 1), (1, 0), (2, 0), (3, 0), (2, 0), (0, 3), (1, 2), (3, 0)];
    for (actor, target) in pairs {
        blog.toggle_follow(&users[actor], &users[target]).await.expect("toggle");
        blog.toggle_post_like(&users[actor], &post).await.expect("like");
        blog.toggle_comment_like(&users[target], &comment.id).await.expect("comment like");
    }

    for id in &users {
        let user = blog.get_user(id).await.unwrap();
        assert_eq!(user.followers_count, user.followers.len() as i64);
        assert_eq!(user.following_count, user.following.len() as i64);
    }
    let post = blog.get_post(&post).await.unwrap();
    assert_eq!(post.likes_count, post.likes.len() as i64);
    let comment = blog.get_comment(&comment.id).await.unwrap();
    assert_eq!(comment.likes_count, comment.likes.len() as i64);
}

#[tokio::test]
async fn like_on_draft_is_rejected_and_count_unchanged() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let draft = write_post(&mut blog, &author, PostStatus::Draft).await;

    let err = blog.toggle_post_like(&reader, &draft).await.unwrap_err();
    assert!(matches!(
        err,
        EngageError::InvalidState {
            entity: EntityKind::Post,
            reason: StateViolation::PostNotPublished,
            ..
        }
    ));
    assert_eq!(blog.get_post(&draft).await.unwrap().likes_count, 0);
    assert!(blog.get_user(&reader).await.unwrap().liked_posts.is_empty());
}

#[tokio::test]
async fn liking_a_deleted_comment_is_rejected() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &author, PostStatus::Published).await;
    let comment = blog.create_comment(&author, &post, "soon gone", None).await.unwrap();
    blog.soft_delete_comment(&author, &comment.id).await.unwrap();

    let err = blog.toggle_comment_like(&reader, &comment.id).await.unwrap_err();
    assert!(matches!(
        err,
        EngageError::InvalidState {
            reason: StateViolation::CommentDeleted,
            ..
        }
    ));
}

#[tokio::test]
async fn missing_targets_are_not_found() {
    let mut blog = memory_blog();
    let a = register(&mut blog, "alice").await;

    assert!(blog.toggle_follow(&a, "nobody").await.unwrap_err().is_not_found());
    assert!(blog.toggle_post_like(&a, "no-post").await.unwrap_err().is_not_found());
    assert!(blog.toggle_comment_like(&a, "no-comment").await.unwrap_err().is_not_found());
    assert!(blog.toggle_follow("ghost", &a).await.unwrap_err().is_not_found());
    assert_eq!(blog.get_user(&a).await.unwrap().followers_count, 0);
}

#[tokio::test]
async fn failed_target_side_is_partial_failure() {
    let mut blog = faulty_blog();
    let a = register(&mut blog, "alice").await;
    let b = register(&mut blog, "bobby").await;

    blog.executor_mut().fail_on = Some(format!("users:{b}.followers"));
    let err = blog.toggle_follow(&a, &b).await.unwrap_err();
    let EngageError::PartialFailure {
        operation,
        completed,
        failed,
        ..
    } = err
    else {
        panic!("expected partial failure");
    };
    assert_eq!(operation, "follow");
    assert_eq!(completed, format!("users:{a}.following"));
    assert_eq!(failed, format!("users:{b}.followers"));

    // The actor side stays written; nothing is rolled back.
    assert!(blog.is_following(&a, &b).await.unwrap());
    assert!(blog.get_user(&b).await.unwrap().followers.is_empty());
}

#[tokio::test]
async fn failed_liker_side_is_partial_failure_and_converges() {
    let mut blog = faulty_blog();
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &author, PostStatus::Published).await;

    blog.executor_mut().fail_on = Some(format!("users:{reader}.liked_posts"));
    let err = blog.toggle_post_like(&reader, &post).await.unwrap_err();
    let EngageError::PartialFailure {
        operation,
        completed,
        failed,
        ..
    } = err
    else {
        panic!("expected partial failure");
    };
    assert_eq!(operation, "post_like");
    assert_eq!(completed, format!("posts:{post}.likes"));
    assert_eq!(failed, format!("users:{reader}.liked_posts"));

    // The post keeps the like; the reader's list does not have it.
    let stored = blog.get_post(&post).await.unwrap();
    assert!(stored.is_liked_by(&reader));
    assert_eq!(stored.likes_count, 1);
    assert!(blog.get_user(&reader).await.unwrap().liked_posts.is_empty());

    let report = blog.audit_post(&post).await.unwrap();
    assert!(report.drift.iter().any(|drift| matches!(
        drift,
        plume::Drift::MissingReverse { field, other_id, .. } if field == "liked_posts" && *other_id == reader
    )));

    // The post side decides the next toggle, so both sides end up unliked.
    let outcome = blog.toggle_post_like(&reader, &post).await.unwrap();
    assert!(!outcome.is_liked);
    assert_eq!(outcome.likes_count, 0);
    assert!(blog.get_user(&reader).await.unwrap().liked_posts.is_empty());
    assert!(blog.audit_post(&post).await.unwrap().is_consistent());
}
