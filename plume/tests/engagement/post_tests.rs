use super::support::*;

#[tokio::test]
async fn deleting_a_post_repairs_author_and_likers() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let r1 = register(&mut blog, "bobby").await;
    let r2 = register(&mut blog, "carol").await;
    let post = write_post(&mut blog, &author, PostStatus::Published).await;
    let other = write_post(&mut blog, &author, PostStatus::Published).await;

    blog.toggle_post_like(&r1, &post).await.unwrap();
    blog.toggle_post_like(&r2, &post).await.unwrap();
    blog.toggle_post_like(&r1, &other).await.unwrap();
    assert_eq!(blog.get_user(&author).await.unwrap().posts_count, 2);
    assert_eq!(blog.user_likes_received(&author).await.unwrap(), 3);

    let err = blog.delete_post(&r1, &post).await.unwrap_err();
    assert!(matches!(err, EngageError::Authorization { .. }));

    blog.delete_post(&author, &post).await.unwrap();
    assert_eq!(blog.get_user(&author).await.unwrap().posts_count, 1);
    assert_eq!(blog.get_user(&r1).await.unwrap().liked_posts, vec![other.clone()]);
    assert!(blog.get_user(&r2).await.unwrap().liked_posts.is_empty());
    assert_eq!(blog.user_likes_received(&author).await.unwrap(), 1);
    assert!(blog.delete_post(&author, &post).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn publishing_enables_likes() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &author, PostStatus::Draft).await;

    assert!(blog.toggle_post_like(&reader, &post).await.is_err());
    blog.set_post_status(&author, &post, PostStatus::Published).await.unwrap();
    let like = blog.toggle_post_like(&reader, &post).await.unwrap();
    assert!(like.is_liked);

    blog.set_post_status(&author, &post, PostStatus::Archived).await.unwrap();
    let err = blog.toggle_post_like(&reader, &post).await.unwrap_err();
    assert!(matches!(
        err,
        EngageError::InvalidState {
            reason: StateViolation::PostNotPublished,
            ..
        }
    ));
    // Archived posts keep their likes but drop out of liked-post listings.
    assert_eq!(blog.get_post(&post).await.unwrap().likes_count, 1);
    assert_eq!(blog.liked_posts(&reader, 1, 10).await.unwrap().total, 0);
}

#[tokio::test]
async fn archived_cannot_go_back_to_draft() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let post = write_post(&mut blog, &author, PostStatus::Published).await;
    blog.set_post_status(&author, &post, PostStatus::Archived).await.unwrap();

    let err = blog.set_post_status(&author, &post, PostStatus::Draft).await.unwrap_err();
    assert!(matches!(
        err,
        EngageError::InvalidState {
            reason: StateViolation::IllegalStatusTransition,
            ..
        }
    ));
}

#[tokio::test]
async fn invalid_post_input_is_rejected() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let err = blog
        .create_post(
            &author,
            NewPost {
                title: "   ".to_string(),
                content: String::new(),
                tags: Vec::new(),
                status: PostStatus::Published,
            },
        )
        .await
        .unwrap_err();
    let EngageError::Validation(validation) = err else {
        panic!("expected validation error");
    };
    assert_eq!(validation.issues.len(), 2);
    assert_eq!(blog.get_user(&author).await.unwrap().posts_count, 0);
}

#[tokio::test]
async fn failed_posts_count_is_partial_failure() {
    let mut blog = faulty_blog();
    let author = register(&mut blog, "alice").await;
    blog.executor_mut().fail_on = Some(format!("users:{author}.posts_count"));

    let err = blog
        .create_post(
            &author,
            NewPost {
                title: "Half written".to_string(),
                content: "body".to_string(),
                tags: Vec::new(),
                status: PostStatus::Draft,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngageError::PartialFailure { operation: "create_post", .. }));

    let drifted = blog.audit_user(&author).await.unwrap();
    assert_eq!(drifted.drift.len(), 1);
    assert_eq!(blog.recount_user(&author).await.unwrap().posts_count, 1);
}

#[tokio::test]
async fn feed_follows_the_graph_and_falls_back_to_everything() {
    let mut blog = memory_blog();
    let reader = register(&mut blog, "alice").await;
    let followed = register(&mut blog, "bobby").await;
    let stranger = register(&mut blog, "carol").await;
    let kept = write_post(&mut blog, &followed, PostStatus::Published).await;
    write_post(&mut blog, &followed, PostStatus::Draft).await;
    let elsewhere = write_post(&mut blog, &stranger, PostStatus::Published).await;

    // Following nobody: every published post.
    let everything = blog.feed(&reader, 1, 10).await.unwrap();
    assert_eq!(everything.total, 2);
    let ids: Vec<&str> = everything.items.iter().map(|post| post.id.as_str()).collect();
    assert!(ids.contains(&kept.as_str()));
    assert!(ids.contains(&elsewhere.as_str()));

    blog.toggle_follow(&reader, &followed).await.unwrap();
    let feed = blog.feed(&reader, 1, 10).await.unwrap();
    assert_eq!(feed.total, 1);
    assert_eq!(feed.items[0].id, kept);

    // Deleted posts drop out of both listings.
    blog.delete_post(&followed, &kept).await.unwrap();
    assert_eq!(blog.feed(&reader, 1, 10).await.unwrap().total, 0);
    blog.toggle_follow(&reader, &followed).await.unwrap();
    assert_eq!(blog.feed(&reader, 1, 10).await.unwrap().total, 1);

    assert!(blog.feed("ghost", 1, 10).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn editing_a_post_recomputes_derived_fields_only() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let reader = register(&mut blog, "bobby").await;
    let post = write_post(&mut blog, &author, PostStatus::Published).await;
    blog.toggle_post_like(&reader, &post).await.unwrap();

    let content = format!("<p>{}</p>", "word ".repeat(450));
    let edited = blog
        .update_post(
            &author,
            &post,
            plume::PostUpdate {
                title: Some("  Second draft  ".to_string()),
                content: Some(content),
                tags: Some(vec!["Rust".to_string(), "rust ".to_string()]),
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.title, "Second draft");
    assert_eq!(edited.reading_time, 3);
    assert!(edited.excerpt.starts_with("word word"));
    assert!(edited.excerpt.ends_with("..."));
    assert_eq!(edited.tags, vec!["rust".to_string()]);
    assert_eq!(edited.likes_count, 1);
    assert!(edited.is_liked_by(&reader));

    let err = blog
        .update_post(
            &reader,
            &post,
            plume::PostUpdate {
                title: Some("mine now".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "authorization");

    let err = blog.update_post(&author, &post, plume::PostUpdate::default()).await.unwrap_err();
    assert!(matches!(err, EngageError::Validation(_)));
    assert_eq!(blog.get_post(&post).await.unwrap().title, "Second draft");
}

#[tokio::test]
async fn trending_ranks_recent_published_posts_by_likes() {
    let mut blog = memory_blog();
    let author = register(&mut blog, "alice").await;
    let r1 = register(&mut blog, "bobby").await;
    let r2 = register(&mut blog, "carol").await;
    let quiet = write_post(&mut blog, &author, PostStatus::Published).await;
    let popular = write_post(&mut blog, &author, PostStatus::Published).await;
    write_post(&mut blog, &author, PostStatus::Draft).await;

    blog.toggle_post_like(&r1, &popular).await.unwrap();
    blog.toggle_post_like(&r2, &popular).await.unwrap();
    blog.toggle_post_like(&r1, &quiet).await.unwrap();

    let trending = blog.trending(None, 10).await.unwrap();
    let ids: Vec<&str> = trending.iter().map(|post| post.id.as_str()).collect();
    assert_eq!(ids, vec![popular.as_str(), quiet.as_str()]);
    assert_eq!(blog.trending(None, 1).await.unwrap().len(), 1);
}
