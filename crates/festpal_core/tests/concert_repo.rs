use festpal_core::{
    open_db_in_memory, Concert, ConcertPatch, ConcertRepository, Festival, FestivalRepository,
    ModelValidationError, RepoError, SqliteConcertRepository, SqliteFestivalRepository,
};
use rusqlite::Connection;

fn festival(conn: &Connection, name: &str) -> i64 {
    SqliteFestivalRepository::new(conn)
        .create_festival(&Festival::new(name, "ivan"))
        .unwrap()
}

#[test]
fn create_requires_existing_festival() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteConcertRepository::new(&conn);

    let err = repo
        .create_concert(&Concert::new(404, "Band", 1, 1, 1_000, 2_000))
        .unwrap_err();
    assert!(matches!(err, RepoError::FestivalNotFound(404)));
}

#[test]
fn create_validates_time_range() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let repo = SqliteConcertRepository::new(&conn);

    let err = repo
        .create_concert(&Concert::new(festival_id, "Band", 1, 1, 2_000, 1_000))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::EndBeforeStart { .. })
    ));
}

#[test]
fn list_orders_by_day_then_start() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let other_id = festival(&conn, "Sziget");
    let repo = SqliteConcertRepository::new(&conn);

    assert!(!repo.festival_has_concerts(festival_id).unwrap());
    repo.create_concert(&Concert::new(festival_id, "Late", 1, 2, 100, 200))
        .unwrap();
    repo.create_concert(&Concert::new(festival_id, "Evening", 2, 1, 500, 600))
        .unwrap();
    repo.create_concert(&Concert::new(festival_id, "Opener", 1, 1, 100, 200))
        .unwrap();
    repo.create_concert(&Concert::new(other_id, "Elsewhere", 1, 1, 0, 1))
        .unwrap();

    let artists: Vec<String> = repo
        .list_concerts(festival_id)
        .unwrap()
        .into_iter()
        .map(|concert| concert.artist)
        .collect();
    assert_eq!(artists, vec!["Opener", "Evening", "Late"]);
    assert!(repo.festival_has_concerts(festival_id).unwrap());
}

#[test]
fn update_merges_and_revalidates() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let repo = SqliteConcertRepository::new(&conn);
    let id = repo
        .create_concert(&Concert::new(festival_id, "Band", 1, 1, 1_000, 2_000))
        .unwrap();

    let patch = ConcertPatch {
        external_id: Some(31),
        notify: Some(true),
        end_ms: Some(3_000),
        ..ConcertPatch::default()
    };
    repo.update_concert(id, &patch).unwrap();

    let loaded = repo.get_concert(id).unwrap().unwrap();
    assert!(loaded.notify);
    assert_eq!(loaded.end_ms, 3_000);
    assert_eq!(loaded.start_ms, 1_000);
    assert_eq!(
        repo.get_concert_by_external_id(festival_id, 31)
            .unwrap()
            .unwrap()
            .id,
        Some(id)
    );

    let reversed = ConcertPatch {
        start_ms: Some(9_000),
        ..ConcertPatch::default()
    };
    assert!(matches!(
        repo.update_concert(id, &reversed).unwrap_err(),
        RepoError::Validation(_)
    ));
}

#[test]
fn update_festival_reference_must_resolve() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let repo = SqliteConcertRepository::new(&conn);
    let id = repo
        .create_concert(&Concert::new(festival_id, "Band", 1, 1, 1_000, 2_000))
        .unwrap();

    let patch = ConcertPatch {
        festival_id: Some(999),
        ..ConcertPatch::default()
    };
    assert!(matches!(
        repo.update_concert(id, &patch).unwrap_err(),
        RepoError::FestivalNotFound(999)
    ));

    let moved_to = festival(&conn, "Sziget");
    let patch = ConcertPatch {
        festival_id: Some(moved_to),
        ..ConcertPatch::default()
    };
    repo.update_concert(id, &patch).unwrap();
    assert_eq!(repo.get_concert(id).unwrap().unwrap().festival_id, moved_to);
}

#[test]
fn external_id_is_unique_per_festival() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let other_id = festival(&conn, "Sziget");
    let repo = SqliteConcertRepository::new(&conn);

    let mut concert = Concert::new(festival_id, "Band", 1, 1, 1_000, 2_000);
    concert.external_id = Some(5);
    repo.create_concert(&concert).unwrap();
    assert!(repo.create_concert(&concert).is_err());

    concert.festival_id = other_id;
    repo.create_concert(&concert).unwrap();
    assert!(repo
        .get_concert_by_external_id(other_id, 5)
        .unwrap()
        .is_some());
}

#[test]
fn delete_missing_concert_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let repo = SqliteConcertRepository::new(&conn);
    let id = repo
        .create_concert(&Concert::new(festival_id, "Band", 1, 1, 1_000, 2_000))
        .unwrap();

    repo.delete_concert(id).unwrap();
    assert!(matches!(
        repo.delete_concert(id).unwrap_err(),
        RepoError::ConcertNotFound(_)
    ));
}

#[test]
fn read_rejects_invalid_notify_flag() {
    let conn = open_db_in_memory().unwrap();
    let festival_id = festival(&conn, "Exit");
    let repo = SqliteConcertRepository::new(&conn);
    let id = repo
        .create_concert(&Concert::new(festival_id, "Band", 1, 1, 1_000, 2_000))
        .unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute("UPDATE concerts SET notify = 2 WHERE id = ?1;", [id])
        .unwrap();

    assert!(matches!(
        repo.get_concert(id).unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn unlink_clears_external_ids_of_one_festival() {
    let conn = open_db_in_memory().unwrap();
    let exit = festival(&conn, "Exit");
    let sziget = festival(&conn, "Sziget");
    let repo = SqliteConcertRepository::new(&conn);
    let mut linked = Concert::new(exit, "Band A", 1, 1, 1_000, 2_000);
    linked.external_id = Some(50);
    let linked = repo.create_concert(&linked).unwrap();
    repo.create_concert(&Concert::new(exit, "Band B", 1, 1, 3_000, 4_000))
        .unwrap();
    let mut other = Concert::new(sziget, "Band C", 1, 1, 1_000, 2_000);
    other.external_id = Some(60);
    let other = repo.create_concert(&other).unwrap();

    assert_eq!(repo.unlink_concerts(exit).unwrap(), 1);

    assert_eq!(repo.get_concert(linked).unwrap().unwrap().external_id, None);
    assert_eq!(repo.get_concert(other).unwrap().unwrap().external_id, Some(60));
}
