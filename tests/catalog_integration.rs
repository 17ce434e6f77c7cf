use chrono::{Duration, Utc};
use noteshub_core::catalog::{Catalog, ListOptions, SortMode};
use noteshub_core::domain::{NewNote, Visibility, VoteChoice};
use noteshub_core::error::HubError;
use noteshub_core::notes::Notes;
use noteshub_core::store::Store;
use noteshub_core::vote::VoteLedger;
use tempfile::TempDir;

async fn setup() -> (TempDir, Store) {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(tmp.path()).await.unwrap();
    (tmp, store)
}

fn note(owner: &str, title: &str) -> NewNote {
    NewNote {
        title: title.into(),
        subject: "Physics".into(),
        university: "TU Delft".into(),
        tags: vec![],
        owner_id: owner.into(),
        content_ref: "ref://notes.pdf".into(),
        visibility: Visibility::Public,
    }
}

#[tokio::test]
async fn visibility_is_always_conjoined_first() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let catalog = Catalog::new(&store);

    let public = notes.create(note("alice", "Public Mechanics")).await?;
    let private = notes
        .create(NewNote {
            visibility: Visibility::Private,
            ..note("alice", "Private Mechanics")
        })
        .await?;

    // guests: public only
    let page = catalog.list(None, &ListOptions::default()).await?;
    let ids: Vec<&str> = page.items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![public.id.as_str()]);
    assert_eq!(page.total, 1);

    // the owner also sees their own private note
    let page = catalog.list(Some("alice"), &ListOptions::default()).await?;
    assert_eq!(page.total, 2);
    assert!(page.items.iter().any(|n| n.id == private.id));

    // another signed-in user does not
    let page = catalog.list(Some("bob"), &ListOptions::default()).await?;
    let ids: Vec<&str> = page.items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![public.id.as_str()]);

    Ok(())
}

#[tokio::test]
async fn facet_filters_combine_conjunctively() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let catalog = Catalog::new(&store);

    notes.create(note("alice", "Delft Physics")).await?;
    notes
        .create(NewNote {
            subject: "Math".into(),
            ..note("alice", "Delft Math")
        })
        .await?;
    notes
        .create(NewNote {
            university: "ETH Zurich".into(),
            ..note("alice", "Zurich Physics")
        })
        .await?;

    let page = catalog
        .list(
            None,
            &ListOptions {
                subject: Some("Physics".into()),
                university: Some("TU Delft".into()),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Delft Physics");

    Ok(())
}

#[tokio::test]
async fn tag_filter_matches_on_intersection() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let catalog = Catalog::new(&store);

    notes
        .create(NewNote {
            tags: vec!["algebra".into(), "exam prep".into()],
            ..note("alice", "Algebra Pack")
        })
        .await?;
    notes
        .create(NewNote {
            tags: vec!["optics".into()],
            ..note("alice", "Optics Pack")
        })
        .await?;

    // one requested tag overlapping is enough
    let page = catalog
        .list(
            None,
            &ListOptions {
                tags: vec!["exam prep".into(), "nonexistent".into()],
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Algebra Pack");

    // no overlap, no results
    let page = catalog
        .list(
            None,
            &ListOptions {
                tags: vec!["nonexistent".into()],
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.total, 0);

    Ok(())
}

#[tokio::test]
async fn text_query_searches_title_subject_university_and_tags() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let catalog = Catalog::new(&store);

    notes.create(note("alice", "Quantum Mechanics Summary")).await?;
    notes
        .create(NewNote {
            tags: vec!["relativity".into()],
            ..note("alice", "Spacetime Essentials")
        })
        .await?;
    notes
        .create(NewNote {
            subject: "Math".into(),
            university: "Cambridge".into(),
            ..note("alice", "Integrals")
        })
        .await?;

    let search = |q: &str| ListOptions {
        text_query: Some(q.into()),
        ..Default::default()
    };

    let page = catalog.list(None, &search("quantum")).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Quantum Mechanics Summary");

    // tag text is indexed too
    let page = catalog.list(None, &search("relativity")).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Spacetime Essentials");

    let page = catalog.list(None, &search("cambridge")).await?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Integrals");

    // blank queries are ignored rather than matching nothing
    let page = catalog.list(None, &search("   ")).await?;
    assert_eq!(page.total, 3);

    Ok(())
}

#[tokio::test]
async fn text_query_syntax_is_never_interpreted() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let catalog = Catalog::new(&store);

    notes.create(note("alice", "Quantum Mechanics Summary")).await?;

    // would be FTS5 syntax errors if passed through raw
    for hostile in ["\"unbalanced", "AND", "quantum OR", "title:("] {
        let page = catalog
            .list(
                None,
                &ListOptions {
                    text_query: Some(hostile.into()),
                    ..Default::default()
                },
            )
            .await?;
        assert!(page.total <= 1, "query {hostile:?} must not error");
    }

    Ok(())
}

#[tokio::test]
async fn sort_modes_order_by_votes_and_recency() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let ledger = VoteLedger::new(&store);
    let catalog = Catalog::new(&store);

    let now = Utc::now();
    let older = notes
        .create_at(note("alice", "Older"), now - Duration::hours(1))
        .await?;
    let newer = notes.create_at(note("alice", "Newer"), now).await?;

    // older note is the popular one
    for user in ["u1", "u2", "u3"] {
        ledger.apply(&older.id, user, VoteChoice::Upvote).await?;
    }
    ledger.apply(&newer.id, "u1", VoteChoice::Upvote).await?;
    ledger.apply(&newer.id, "u2", VoteChoice::Downvote).await?;

    let list = |sort: SortMode| ListOptions {
        sort,
        ..Default::default()
    };

    let page = catalog.list(None, &list(SortMode::Latest)).await?;
    let ids: Vec<&str> = page.items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);

    let page = catalog.list(None, &list(SortMode::Top)).await?;
    let ids: Vec<&str> = page.items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![older.id.as_str(), newer.id.as_str()]);

    let page = catalog.list(None, &list(SortMode::Bottom)).await?;
    let ids: Vec<&str> = page.items.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);

    Ok(())
}

#[tokio::test]
async fn pagination_reports_the_unpaginated_total() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let notes = Notes::new(&store);
    let catalog = Catalog::new(&store);

    let now = Utc::now();
    for i in 0..5 {
        notes
            .create_at(
                note("alice", &format!("Note {i}")),
                now - Duration::minutes(i),
            )
            .await?;
    }

    let page = catalog
        .list(
            None,
            &ListOptions {
                page: 1,
                page_size: 2,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 5);
    assert_eq!(page.page_count, 3);
    assert_eq!(page.items[0].title, "Note 0");

    let page = catalog
        .list(
            None,
            &ListOptions {
                page: 3,
                page_size: 2,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].title, "Note 4");

    // past the end: empty items, same totals
    let page = catalog
        .list(
            None,
            &ListOptions {
                page: 9,
                page_size: 2,
                ..Default::default()
            },
        )
        .await?;
    assert!(page.items.is_empty());
    assert_eq!(page.total, 5);

    Ok(())
}

#[tokio::test]
async fn page_size_is_capped() -> Result<(), HubError> {
    let (_tmp, store) = setup().await;
    let catalog = Catalog::new(&store);

    let page = catalog
        .list(
            None,
            &ListOptions {
                page_size: 1000,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.page_size, 100);

    // page 0 is normalized to the first page
    let page = catalog
        .list(
            None,
            &ListOptions {
                page: 0,
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(page.page, 1);

    Ok(())
}
