use chrono::{NaiveDate, Utc};
use tempfile::tempdir;

use ratemyhydrograph_lib::db::{CommitOutcome, Database, RatingDraft};
use ratemyhydrograph_lib::rating::{AxisScale, Outcome};
use ratemyhydrograph_lib::rotation::FocusPhase;

fn draft(user_id: &str, outcome: Outcome) -> RatingDraft {
    RatingDraft {
        user_id: user_id.to_string(),
        expected_counter: None,
        objective: "obj1".to_string(),
        basin: "B1".to_string(),
        start_date: NaiveDate::from_ymd_opt(2013, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2014, 12, 31).unwrap(),
        model_a: "modelX".to_string(),
        model_b: "modelY".to_string(),
        outcome,
        rating_duration_ms: 4_200,
        x_zoomed: false,
        y_zoomed: true,
        x_range_start: Some("2013-01-01".to_string()),
        x_range_end: Some("2014-12-31".to_string()),
        y_range_start: Some(0.0),
        y_range_end: Some(12.5),
        y_scale: AxisScale::Log,
        submitted_at: Utc::now(),
    }
}

#[tokio::test]
async fn commit_stores_phase_of_counter_and_increments() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();
    let user = db.create_user().await.unwrap();
    assert_eq!(user.n_rated_hydrographs, 0);

    for k in 0..7u64 {
        let committed = db
            .commit_rating(draft(&user.id, Outcome::AWins))
            .await
            .unwrap()
            .into_committed()
            .expect("user exists");
        assert_eq!(committed.rated_count, k + 1);
        assert_eq!(committed.event.task, FocusPhase::for_counter(k));
        assert_eq!(committed.event.rating_style, "winner");
    }

    let user = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(user.n_rated_hydrographs, 7);

    let ratings = db.list_ratings_for_user(&user.id).await.unwrap();
    let tasks: Vec<FocusPhase> = ratings.iter().map(|r| r.task).collect();
    assert_eq!(
        tasks,
        vec![
            FocusPhase::Overall,
            FocusPhase::Overall,
            FocusPhase::Overall,
            FocusPhase::Overall,
            FocusPhase::Overall,
            FocusPhase::HighFlow,
            FocusPhase::HighFlow,
        ]
    );

    let first = &ratings[0];
    assert_eq!(first.outcome, Outcome::AWins);
    assert_eq!(first.rating_duration_ms, 4_200);
    assert!(first.y_zoomed);
    assert!(!first.x_zoomed);
    assert_eq!(first.y_scale, AxisScale::Log);
    assert_eq!(first.y_range_end, Some(12.5));
    assert_eq!(first.x_range_start.as_deref(), Some("2013-01-01"));
    assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2013, 1, 1).unwrap());
}

#[tokio::test]
async fn commit_at_a_moved_counter_writes_nothing() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();
    let user = db.create_user().await.unwrap();

    let at_zero = RatingDraft {
        expected_counter: Some(0),
        ..draft(&user.id, Outcome::AWins)
    };
    let first = db.commit_rating(at_zero.clone()).await.unwrap();
    assert_eq!(first.into_committed().unwrap().rated_count, 1);

    let replay = db.commit_rating(at_zero).await.unwrap();
    assert_eq!(replay, CommitOutcome::Stale { counter: 1 });
    assert_eq!(db.count_ratings().await.unwrap(), 1);
    let user = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(user.n_rated_hydrographs, 1);
}

#[tokio::test]
async fn concurrent_commits_never_lose_an_increment() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();
    let user = db.create_user().await.unwrap();

    const N: u64 = 12;
    let handles: Vec<_> = (0..N)
        .map(|_| {
            let db = db.clone();
            let user_id = user.id.clone();
            tokio::spawn(async move { db.commit_rating(draft(&user_id, Outcome::Skip)).await })
        })
        .collect();
    let mut counts = Vec::new();
    for handle in handles {
        let committed = handle.await.unwrap().unwrap().into_committed().unwrap();
        counts.push(committed.rated_count);
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=N).collect::<Vec<_>>());

    let user = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(user.n_rated_hydrographs, N);
    let tasks: Vec<FocusPhase> = db
        .list_ratings_for_user(&user.id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.task)
        .collect();
    let expected: Vec<FocusPhase> = (0..N).map(FocusPhase::for_counter).collect();
    assert_eq!(tasks, expected);
}

#[tokio::test]
async fn concurrent_commits_of_one_trial_store_it_once() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();
    let user = db.create_user().await.unwrap();

    let at_zero = RatingDraft {
        expected_counter: Some(0),
        ..draft(&user.id, Outcome::BWins)
    };
    let (a, b) = tokio::join!(
        db.commit_rating(at_zero.clone()),
        db.commit_rating(at_zero)
    );
    let committed = [a.unwrap(), b.unwrap()]
        .into_iter()
        .filter_map(CommitOutcome::into_committed)
        .count();
    assert_eq!(committed, 1);
    assert_eq!(db.count_ratings().await.unwrap(), 1);
}

#[tokio::test]
async fn every_outcome_reads_back() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();
    let user = db.create_user().await.unwrap();

    let outcomes = [
        Outcome::AWins,
        Outcome::BWins,
        Outcome::EqualGood,
        Outcome::EqualBad,
        Outcome::Skip,
    ];
    for outcome in outcomes {
        db.commit_rating(draft(&user.id, outcome))
            .await
            .unwrap()
            .into_committed()
            .unwrap();
    }

    let stored: Vec<Outcome> = db
        .list_ratings_for_user(&user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.outcome)
        .collect();
    assert_eq!(stored, outcomes.to_vec());
}

#[tokio::test]
async fn commit_for_unknown_user_writes_nothing() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();

    let result = db.commit_rating(draft("ghost", Outcome::BWins)).await.unwrap();
    assert_eq!(result, CommitOutcome::UnknownUser);
    assert_eq!(db.count_ratings().await.unwrap(), 0);
    assert_eq!(db.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn leaderboard_ranks_by_strictly_more_ratings() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("ratings.sqlite3")).unwrap();

    let mut users = Vec::new();
    for n in [3, 1, 3, 0] {
        let user = db.create_user().await.unwrap();
        for _ in 0..n {
            db.commit_rating(draft(&user.id, Outcome::EqualGood))
                .await
                .unwrap()
                .into_committed()
                .unwrap();
        }
        users.push(user.id);
    }
    assert_eq!(db.count_users().await.unwrap(), 4);

    let top = db.leaderboard_position(&users[0]).await.unwrap().unwrap();
    assert_eq!(top.position, 1);
    assert!(top.is_leader());
    assert_eq!(top.percentile, 100.0);
    assert_eq!(
        top.text(),
        "You rated 3 hydrographs, this puts you in leaderboard position 1."
    );

    let tied = db.leaderboard_position(&users[2]).await.unwrap().unwrap();
    assert_eq!(tied.position, 1);

    let third = db.leaderboard_position(&users[1]).await.unwrap().unwrap();
    assert_eq!(third.position, 3);
    assert_eq!(third.n_rated, 1);
    assert_eq!(third.percentile, 50.0);
    assert!(!third.is_leader());

    let last = db.leaderboard_position(&users[3]).await.unwrap().unwrap();
    assert_eq!(last.position, 4);
    assert_eq!(last.percentile, 25.0);

    assert!(db.leaderboard_position("ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn ratings_survive_reopening_the_database() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("ratings.sqlite3");

    let user_id = {
        let db = Database::new(path.clone()).unwrap();
        let user = db.create_user().await.unwrap();
        db.commit_rating(draft(&user.id, Outcome::Skip))
            .await
            .unwrap()
            .into_committed()
            .unwrap();
        user.id
    };

    let db = Database::new(path).unwrap();
    let user = db.get_user(&user_id).await.unwrap().unwrap();
    assert_eq!(user.n_rated_hydrographs, 1);
    assert_eq!(db.list_ratings_for_user(&user_id).await.unwrap().len(), 1);
}
