use festpal_core::config::RemoteConfig;
use festpal_core::remote::RegistrationField;
use festpal_core::{
    Concert, ConcertPatch, ConnectivityStatus, Festival, FestivalPatch, FestivalQuery,
    HttpRemoteStore, LoginOutcome, RegisterOutcome, Registration, RemoteError, RemoteRejection,
    RemoteStore,
};
use mockito::{Matcher, Server};

const CLIENT: &str = "festpal-test";

fn store(server: &Server) -> HttpRemoteStore {
    let config = RemoteConfig {
        base_url: server.url(),
        client_name: CLIENT.to_string(),
        connect_timeout_ms: 2_000,
        read_timeout_ms: 2_000,
    };
    HttpRemoteStore::new(&config).unwrap()
}

fn form(pairs: &[(&str, &str)]) -> Matcher {
    let mut matchers: Vec<Matcher> = pairs
        .iter()
        .map(|(key, value)| Matcher::UrlEncoded(key.to_string(), value.to_string()))
        .collect();
    matchers.push(Matcher::UrlEncoded("client".to_string(), CLIENT.to_string()));
    Matcher::AllOf(matchers)
}

const EXIT_JSON: &str = r#"{
    "id": 7,
    "name": "Exit",
    "description": "Fortress festival",
    "country": "Serbia",
    "city": "Novi Sad",
    "address": "Petrovaradin",
    "genre": "rock",
    "prices": "80 EUR",
    "owner": "ivan",
    "official": true,
    "votes": 12,
    "downloads": 340,
    "first_uploaded": 1450000000000,
    "last_modified": 1450000500000
}"#;

#[test]
fn base_url_without_trailing_slash_is_treated_as_directory() {
    let config = RemoteConfig {
        base_url: "http://127.0.0.1:8000/api".to_string(),
        ..RemoteConfig::default()
    };
    let store = HttpRemoteStore::new(&config).unwrap();
    assert_eq!(store.base_url().as_str(), "http://127.0.0.1:8000/api/");

    let config = RemoteConfig {
        base_url: "not a url".to_string(),
        ..RemoteConfig::default()
    };
    assert!(matches!(
        HttpRemoteStore::new(&config),
        Err(RemoteError::InvalidBaseUrl(_))
    ));
}

#[test]
fn read_festival_decodes_record_and_sends_client_name() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/r/fest/")
        .match_body(form(&[("id", "7")]))
        .with_body(EXIT_JSON)
        .create();

    let festival = store(&server).read_festival(7).unwrap().unwrap();
    mock.assert();
    assert_eq!(festival.id, 7);
    assert_eq!(festival.city, "Novi Sad");
    assert!(festival.official);
    assert_eq!(festival.votes, 12);
    assert_eq!(festival.downloads, Some(340));

    let local = festival.to_festival(99);
    assert_eq!(local.external_id, Some(7));
    assert_eq!(local.id, None);
    assert_eq!(local.last_synchronised_ms, 99);
}

#[test]
fn read_festival_unknown_id_is_none() {
    let mut server = Server::new();
    server
        .mock("POST", "/r/fest/")
        .with_body("Invalid Festival ID\n")
        .create();

    assert!(store(&server).read_festival(1).unwrap().is_none());
}

#[test]
fn read_festivals_sends_only_set_filters() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/mult/fest/")
        .match_body(form(&[("num", "3"), ("country", "Serbia"), ("official", "true")]))
        .with_body(format!("[{EXIT_JSON}]"))
        .create();

    let mut query = FestivalQuery::top(3);
    query.country = Some("Serbia".to_string());
    query.official = Some(true);
    let festivals = store(&server).read_festivals(&query).unwrap();

    mock.assert();
    assert_eq!(festivals.len(), 1);
    assert_eq!(festivals[0].name, "Exit");
}

#[test]
fn malformed_json_is_a_decode_error() {
    let mut server = Server::new();
    server
        .mock("POST", "/mult/fest/")
        .with_body("[{\"id\": \"seven\"}]")
        .create();

    assert!(matches!(
        store(&server).read_festivals(&FestivalQuery::default()),
        Err(RemoteError::Decode(_))
    ));
}

#[test]
fn permission_sentinel_fails_every_call() {
    let mut server = Server::new();
    server
        .mock("POST", "/mult/conc/")
        .with_body("Permission not granted\n")
        .create();

    let err = store(&server).read_festival_concerts(7).unwrap_err();
    assert!(matches!(err, RemoteError::PermissionDenied(reason) if reason == "Permission not granted"));
}

#[test]
fn http_error_status_is_reported() {
    let mut server = Server::new();
    server
        .mock("POST", "/d/fest/")
        .with_status(500)
        .with_body("boom")
        .create();

    assert!(matches!(
        store(&server).delete_festival(7),
        Err(RemoteError::Status(500))
    ));
}

#[test]
fn write_festival_returns_reported_external_id() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/w/fest/")
        .match_body(form(&[
            ("name", "Exit"),
            ("city", "Novi Sad"),
            ("official", "false"),
        ]))
        .with_body("OK\n15\n")
        .create();

    let mut festival = Festival::new("Exit", "ivan");
    festival.city = "Novi Sad".to_string();
    let external_id = store(&server).write_festival(&festival).unwrap();

    mock.assert();
    assert_eq!(external_id, Some(15));
}

#[test]
fn write_festival_name_clash_is_rejected() {
    let mut server = Server::new();
    server
        .mock("POST", "/w/fest/")
        .with_body("Name exists\n")
        .create();

    let err = store(&server)
        .write_festival(&Festival::new("Exit", "ivan"))
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Rejected(RemoteRejection::NameExists)
    ));
}

#[test]
fn update_festival_sends_changed_remote_fields_only() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/u/fest/")
        .match_body(Matcher::AllOf(vec![
            form(&[("id", "7"), ("prices", "90 EUR")]),
            Matcher::Regex("^[^&]*(&[^&]*){2}$".to_string()),
        ]))
        .with_body("OK\n")
        .create();

    let patch = FestivalPatch {
        prices: Some("90 EUR".to_string()),
        votes: Some(40),
        ..FestivalPatch::default()
    };
    store(&server).update_festival(7, &patch).unwrap();
    mock.assert();
}

#[test]
fn update_festival_incorrect_input_is_rejected() {
    let mut server = Server::new();
    server
        .mock("POST", "/u/fest/")
        .with_body("Incorrect input\n")
        .create();

    let err = store(&server)
        .update_festival(7, &FestivalPatch::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Rejected(RemoteRejection::IncorrectInput)
    ));
}

#[test]
fn concert_calls_use_scene_and_epoch_ms() {
    let mut server = Server::new();
    let write = server
        .mock("POST", "/w/conc/")
        .match_body(form(&[
            ("festival", "7"),
            ("artist", "Band"),
            ("scene", "2"),
            ("day", "3"),
            ("start", "1000"),
            ("end", "2000"),
        ]))
        .with_body("OK\n31\n")
        .create();
    let read = server
        .mock("POST", "/r/conc/")
        .match_body(form(&[("id", "31")]))
        .with_body(r#"{"id": 31, "festival": 7, "artist": "Band", "scene": 2, "day": 3, "start": 1000, "end": 2000}"#)
        .create();
    let update = server
        .mock("POST", "/u/conc/")
        .match_body(form(&[("id", "31"), ("end", "2500")]))
        .with_body("OK\n")
        .create();

    let store = store(&server);
    let concert = Concert::new(1, "Band", 2, 3, 1_000, 2_000);
    assert_eq!(store.write_concert(7, &concert).unwrap(), Some(31));

    let remote = store.read_concert(31).unwrap().unwrap();
    assert_eq!(remote.scene, 2);
    assert_eq!(remote.festival, 7);
    let local = remote.to_concert(1, 0);
    assert!(local.sync_eq(&concert));
    assert!(!local.notify);

    let patch = ConcertPatch {
        end_ms: Some(2_500),
        notify: Some(true),
        ..ConcertPatch::default()
    };
    store.update_concert(31, &patch).unwrap();

    write.assert();
    read.assert();
    update.assert();
}

#[test]
fn missing_concert_reads_as_none_and_rejects_deletes() {
    let mut server = Server::new();
    server
        .mock("POST", "/r/conc/")
        .with_body("Concert Not Found\n")
        .create();
    server
        .mock("POST", "/d/conc/")
        .with_body("Concert Not Found\n")
        .create();

    let store = store(&server);
    assert!(store.read_concert(5).unwrap().is_none());
    assert!(matches!(
        store.delete_concert(5),
        Err(RemoteError::Rejected(RemoteRejection::ConcertNotFound))
    ));
}

#[test]
fn vote_returns_new_count() {
    let mut server = Server::new();
    server
        .mock("POST", "/v/")
        .match_body(form(&[("id", "7")]))
        .with_body("13\n")
        .create();

    assert_eq!(store(&server).vote(7).unwrap(), 13);
}

#[test]
fn login_session_cookie_is_replayed() {
    let mut server = Server::new();
    let login = server
        .mock("POST", "/login/")
        .match_body(form(&[("username", "ivan"), ("password", "secret")]))
        .with_header("set-cookie", "sessionid=abc123; Path=/")
        .with_body("OK\n")
        .create();
    let logout = server
        .mock("POST", "/logout/")
        .match_header("cookie", Matcher::Regex("sessionid=abc123".to_string()))
        .with_body("Logged out\n")
        .create();

    let store = store(&server);
    assert_eq!(
        store.login("ivan", "secret").unwrap(),
        LoginOutcome::LoggedIn
    );
    assert!(store.logout().unwrap());

    login.assert();
    logout.assert();
}

#[test]
fn login_failures_map_to_outcomes() {
    let mut server = Server::new();
    server
        .mock("POST", "/login/")
        .with_body("No password\n")
        .create();

    assert_eq!(
        store(&server).login("ivan", "").unwrap(),
        LoginOutcome::MissingPassword
    );
}

#[test]
fn register_sends_representative_flag() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/register/")
        .match_body(form(&[
            ("username", "ivan"),
            ("email", "ivan@example.org"),
            ("representative", "1"),
        ]))
        .with_body("Invalid password\n")
        .create();

    let registration = Registration {
        username: "ivan".to_string(),
        email: "ivan@example.org".to_string(),
        password: "x".to_string(),
        representative: true,
        ..Registration::default()
    };
    assert_eq!(
        store(&server).register(&registration).unwrap(),
        RegisterOutcome::InvalidRequiredField(RegistrationField::Password)
    );
    mock.assert();
}

#[test]
fn connectivity_distinguishes_server_failure_and_offline() {
    let mut server = Server::new();
    server.mock("GET", "/").with_status(200).create();
    assert_eq!(store(&server).connectivity(), ConnectivityStatus::Reachable);

    let mut failing = Server::new();
    failing.mock("GET", "/").with_status(503).create();
    assert_eq!(
        store(&failing).connectivity(),
        ConnectivityStatus::ServerUnavailable
    );

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = RemoteConfig {
        base_url: format!("http://127.0.0.1:{port}/"),
        connect_timeout_ms: 500,
        read_timeout_ms: 500,
        ..RemoteConfig::default()
    };
    let offline = HttpRemoteStore::new(&config).unwrap();
    assert_eq!(offline.connectivity(), ConnectivityStatus::Offline);
}
