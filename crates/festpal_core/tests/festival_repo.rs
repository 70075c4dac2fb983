use festpal_core::{
    open_db_in_memory, Concert, ConcertRepository, Festival, FestivalPatch, FestivalRepository,
    ModelValidationError, RepoError, SqliteConcertRepository, SqliteFestivalRepository,
};

fn sample(name: &str) -> Festival {
    let mut festival = Festival::new(name, "ivan");
    festival.country = "Serbia".to_string();
    festival.city = "Novi Sad".to_string();
    festival.genre = "rock, electronic".to_string();
    festival.prices = "80 EUR".to_string();
    festival.last_modified_ms = 1_000;
    festival
}

#[test]
fn create_and_get_roundtrip_assigns_local_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);

    assert!(!repo.has_festivals().unwrap());
    let id = repo.create_festival(&sample("Exit")).unwrap();
    assert!(repo.has_festivals().unwrap());

    let loaded = repo.get_festival(id).unwrap().unwrap();
    assert_eq!(loaded.id, Some(id));
    assert_eq!(loaded.external_id, None);
    assert_eq!(loaded.city, "Novi Sad");
    assert_eq!(loaded.last_modified_ms, 1_000);
    assert!(loaded.sync_eq(&sample("Exit")));
}

#[test]
fn create_rejects_blank_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);

    let err = repo.create_festival(&sample("  ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::EmptyField("name"))
    ));
}

#[test]
fn list_orders_by_name_then_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);

    repo.create_festival(&sample("Sziget")).unwrap();
    let first_exit = repo.create_festival(&sample("Exit")).unwrap();
    let second_exit = repo.create_festival(&sample("Exit")).unwrap();

    let names_and_ids: Vec<(String, Option<i64>)> = repo
        .list_festivals()
        .unwrap()
        .into_iter()
        .map(|festival| (festival.name, festival.id))
        .collect();
    assert_eq!(names_and_ids[0], ("Exit".to_string(), Some(first_exit)));
    assert_eq!(names_and_ids[1], ("Exit".to_string(), Some(second_exit)));
    assert_eq!(names_and_ids[2].0, "Sziget");
}

#[test]
fn update_applies_only_patched_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);
    let id = repo.create_festival(&sample("Exit")).unwrap();

    let patch = FestivalPatch {
        external_id: Some(77),
        city: Some("Petrovaradin".to_string()),
        official: Some(true),
        ..FestivalPatch::default()
    }
    .with_last_modified(5_000);
    repo.update_festival(id, &patch).unwrap();

    let loaded = repo.get_festival(id).unwrap().unwrap();
    assert_eq!(loaded.external_id, Some(77));
    assert_eq!(loaded.city, "Petrovaradin");
    assert!(loaded.official);
    assert_eq!(loaded.country, "Serbia");
    assert_eq!(loaded.last_modified_ms, 5_000);
    assert_eq!(loaded.last_synchronised_ms, 0);

    let by_external = repo.get_festival_by_external_id(77).unwrap().unwrap();
    assert_eq!(by_external.id, Some(id));
}

#[test]
fn update_with_empty_patch_still_checks_existence() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);

    let err = repo
        .update_festival(42, &FestivalPatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::FestivalNotFound(42)));

    let id = repo.create_festival(&sample("Exit")).unwrap();
    repo.update_festival(id, &FestivalPatch::default()).unwrap();
}

#[test]
fn update_rejects_patch_that_blanks_owner() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);
    let id = repo.create_festival(&sample("Exit")).unwrap();

    let patch = FestivalPatch {
        owner: Some(String::new()),
        ..FestivalPatch::default()
    };
    let err = repo.update_festival(id, &patch).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.get_festival(id).unwrap().unwrap().owner, "ivan");
}

#[test]
fn external_id_is_unique() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);

    let mut festival = sample("Exit");
    festival.external_id = Some(9);
    repo.create_festival(&festival).unwrap();
    assert!(matches!(
        repo.create_festival(&festival).unwrap_err(),
        RepoError::Db(_)
    ));
}

#[test]
fn delete_cascades_to_concerts() {
    let conn = open_db_in_memory().unwrap();
    let festivals = SqliteFestivalRepository::new(&conn);
    let concerts = SqliteConcertRepository::new(&conn);

    let id = festivals.create_festival(&sample("Exit")).unwrap();
    let concert_id = concerts
        .create_concert(&Concert::new(id, "Band", 1, 1, 1_000, 2_000))
        .unwrap();

    festivals.delete_festival(id).unwrap();
    assert!(festivals.get_festival(id).unwrap().is_none());
    assert!(concerts.get_concert(concert_id).unwrap().is_none());
    assert!(matches!(
        festivals.delete_festival(id).unwrap_err(),
        RepoError::FestivalNotFound(_)
    ));
}

#[test]
fn read_rejects_invalid_persisted_boolean() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);
    let id = repo.create_festival(&sample("Exit")).unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute("UPDATE festivals SET official = 7 WHERE id = ?1;", [id])
        .unwrap();

    let err = repo.get_festival(id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message.contains("festivals.official")));
}

#[test]
fn read_rejects_negative_votes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);
    let id = repo.create_festival(&sample("Exit")).unwrap();

    conn.execute_batch("PRAGMA ignore_check_constraints = ON;")
        .unwrap();
    conn.execute("UPDATE festivals SET votes = -3 WHERE id = ?1;", [id])
        .unwrap();

    assert!(matches!(
        repo.list_festivals().unwrap_err(),
        RepoError::InvalidData(_)
    ));
}

#[test]
fn unlink_clears_external_id_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteFestivalRepository::new(&conn);
    let mut festival = sample("Exit");
    festival.external_id = Some(7);
    festival.last_synchronised_ms = 2_000;
    let id = repo.create_festival(&festival).unwrap();

    repo.unlink_festival(id).unwrap();

    let loaded = repo.get_festival(id).unwrap().unwrap();
    assert_eq!(loaded.external_id, None);
    assert_eq!(loaded.last_synchronised_ms, 2_000);
    assert!(matches!(
        repo.unlink_festival(id + 1),
        Err(RepoError::FestivalNotFound(_))
    ));
}
