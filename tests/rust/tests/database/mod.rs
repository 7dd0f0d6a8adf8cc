//! CRUD integration tests over the `users` table

use std::time::Duration as StdDuration;

use chrono::Duration;
use rusqlite::ErrorCode;
use mozi_core::short_id;
use mozi_storage::{Crud, Database, Op, Query, Record, StorageError, ValidationError, Value};
use pretty_assertions::assert_eq;
use tests::db::{epoch, stepping_clock, TestDatabase};
use tests::fixtures::{user_fields, User};

fn seed(db: &Database, users: &[(&str, i64)]) -> Vec<User> {
    let mut session = db.session();
    users
        .iter()
        .map(|(name, age)| {
            let email = format!("{}@example.com", name);
            User::create(&mut session, &user_fields(name, &email, *age))
                .expect("Failed to create user")
        })
        .collect()
}

fn ages(users: &[User]) -> Vec<i64> {
    users.iter().filter_map(|u| u.age()).collect()
}

#[test]
fn test_create_and_get_by_id() {
    let test_db = TestDatabase::in_memory();
    let mut session = test_db.db.session();

    let user = User::create(&mut session, &user_fields("foo", "foo@example.com", 12)).unwrap();
    let id = user.id().expect("created user has an id");

    assert_eq!(user.name(), Some("foo"));
    assert_eq!(user.uuid(), Some(short_id("foo", 8).as_str()));
    assert_eq!(user.uuid(), Some("LCa0a2j_"));
    assert!(user.is_abled());
    assert!(user.base().created_at.is_some());
    assert!(!session.in_transaction());

    let loaded = User::get_by_id(&session, id).unwrap().unwrap();
    assert_eq!(loaded, user);
    assert!(User::get_by_id(&session, id + 100).unwrap().is_none());
}

#[test]
fn test_name_is_immutable() {
    let test_db = TestDatabase::in_memory();
    let mut session = test_db.db.session();
    let mut user = User::create(&mut session, &user_fields("foo", "foo@example.com", 12)).unwrap();

    let err = user
        .update(&mut session, &[("name", Value::Text("bar".into()))])
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::Immutable { .. })
    ));
    assert_eq!(err.to_string(), "name is immutable and cannot be modified");

    let stored = User::get_by_id(&session, user.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.name(), Some("foo"));
}

#[test]
fn test_unknown_field() {
    let test_db = TestDatabase::in_memory();
    let mut session = test_db.db.session();

    let err = User::create(&mut session, &[("nickname", Value::Text("f".into()))]).unwrap_err();
    assert_eq!(err.to_string(), "User has no `nickname` attribute.");
    assert!(User::checkf("nickname").is_err());
    assert!(User::checkf("is_abled").is_ok());
    assert!(User::checkf("updated_at").is_ok());
}

#[test]
fn test_update_time() {
    let test_db = TestDatabase::in_memory();
    let now = epoch();
    let mut session = test_db.db.session().with_clock(stepping_clock(now));

    let mut user = User::create(&mut session, &user_fields("foo", "foo@example.com", 12)).unwrap();
    assert_eq!(user.base().created_at, Some(now));
    assert_eq!(user.base().updated_at, Some(now + Duration::seconds(10)));

    user.update(&mut session, &[("email", Value::Text("new@example.com".into()))])
        .unwrap();
    assert_eq!(user.email(), Some("new@example.com"));
    assert_eq!(user.base().created_at, Some(now));
    assert_eq!(user.base().updated_at, Some(now + Duration::seconds(20)));
}

#[test]
fn test_update_keeps_derived_uuid() {
    let test_db = TestDatabase::in_memory();
    let mut session = test_db.db.session();
    let mut user = User::create(&mut session, &user_fields("foo", "foo@example.com", 12)).unwrap();

    user.update(
        &mut session,
        &[("age", Value::Integer(13)), ("is_abled", Value::Integer(0))],
    )
    .unwrap();

    assert_eq!(user.uuid(), Some("LCa0a2j_"));
    assert_eq!(user.age(), Some(13));
    assert!(!user.is_abled());

    let query = Query::new().filter("is_abled", false);
    assert_eq!(User::count(&session, &query).unwrap(), 1);
}

#[test]
fn test_duplicate_name_rolls_back() {
    let test_db = TestDatabase::in_memory();
    let mut session = test_db.db.session();
    User::create(&mut session, &user_fields("foo", "foo@example.com", 12)).unwrap();

    let err = User::create(&mut session, &user_fields("foo", "other@example.com", 30)).unwrap_err();
    assert!(matches!(err, StorageError::Sqlite(_)));
    assert!(!session.in_transaction());
    assert!(test_db.db.connection().is_autocommit());

    // The session stays usable
    User::create(&mut session, &user_fields("bar", "bar@example.com", 30)).unwrap();
    assert_eq!(User::count(&session, &Query::new()).unwrap(), 2);
}

#[test]
fn test_get_single_record() {
    let test_db = TestDatabase::in_memory();
    seed(&test_db.db, &[("foo", 12), ("bar", 20), ("baz", 20)]);
    let session = test_db.db.session();

    let user = User::get(&session, &Query::new().filter("name", "foo".to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(user.age(), Some(12));

    let none = User::get(&session, &Query::new().filter("name", "nobody".to_string())).unwrap();
    assert!(none.is_none());

    let err = User::get(&session, &Query::new().filter("age", 20)).unwrap_err();
    assert!(matches!(err, StorageError::MultipleRecords { .. }));
    assert!(err
        .to_string()
        .starts_with("Multiple records found for User with"));
}

#[test]
fn test_gets_with_pagination_and_order() {
    let test_db = TestDatabase::in_memory();
    seed(
        &test_db.db,
        &[("u1", 10), ("u2", 20), ("u3", 30), ("u4", 40), ("u5", 50)],
    );
    let session = test_db.db.session();

    // Insertion order without an order key
    let (total, users) = User::gets(&session, &Query::new()).unwrap();
    assert_eq!(total, 5);
    assert_eq!(ages(&users), vec![10, 20, 30, 40, 50]);

    let query = Query::new().order_by("-age").start(1).limit(2);
    let (total, users) = User::gets(&session, &query).unwrap();
    assert_eq!(total, 5);
    assert_eq!(ages(&users), vec![40, 30]);

    let query = Query::new().condition("age", Op::Ge, 20).order_by("age").limit(10);
    let (total, users) = User::gets(&session, &query).unwrap();
    assert_eq!(total, 4);
    assert_eq!(ages(&users), vec![20, 30, 40, 50]);

    let (total, users) = User::gets(&session, &Query::new().start(10)).unwrap();
    assert_eq!(total, 5);
    assert!(users.is_empty());

    let err = User::gets(&session, &Query::new().order_by("-height")).unwrap_err();
    assert_eq!(err.to_string(), "User has no `height` attribute.");
}

#[test]
fn test_gets_by_ids() {
    let test_db = TestDatabase::in_memory();
    let users = seed(&test_db.db, &[("foo", 1), ("bar", 2), ("baz", 3)]);
    let session = test_db.db.session();

    let ids: Vec<i64> = users.iter().rev().filter_map(|u| u.id()).collect();
    let loaded = User::gets_by_ids(&session, &ids).unwrap();
    assert_eq!(ages(&loaded), vec![1, 2, 3]);

    let missing = User::gets_by_ids(&session, &[ids[0], 999]).unwrap();
    assert_eq!(missing.len(), 1);

    assert!(User::gets_by_ids(&session, &[]).unwrap().is_empty());
}

#[test]
fn test_delete() {
    let test_db = TestDatabase::in_memory();
    let mut users = seed(&test_db.db, &[("foo", 1), ("bar", 2)]);
    let mut session = test_db.db.session();

    let bar = users.pop().unwrap();
    let bar_id = bar.id().unwrap();
    bar.delete(&mut session).unwrap();

    assert!(User::get_by_id(&session, bar_id).unwrap().is_none());
    assert_eq!(User::count(&session, &Query::new()).unwrap(), 1);

    // Never stored
    User::default().delete(&mut session).unwrap();
    assert_eq!(User::count(&session, &Query::new()).unwrap(), 1);
}

#[test]
fn test_get_for_update_holds_transaction() {
    let test_db = TestDatabase::new();
    let users = seed(&test_db.db, &[("foo", 1)]);
    let id = users[0].id().unwrap();

    let mut session = test_db.db.session();
    let mut user = User::get_for_update(&mut session, id).unwrap().unwrap();
    assert!(session.in_transaction());

    user.update(&mut session, &[("age", Value::Integer(2))]).unwrap();
    assert!(!session.in_transaction());
    drop(session);

    let reopened = Database::open(test_db.db_path()).unwrap();
    let stored = User::get_by_id(&reopened.session(), id).unwrap().unwrap();
    assert_eq!(stored.age(), Some(2));
}

fn is_busy(err: &StorageError) -> bool {
    matches!(err, StorageError::Sqlite(e) if e.sqlite_error_code() == Some(ErrorCode::DatabaseBusy))
}

#[test]
fn test_get_for_update_blocks_other_writers() {
    let test_db = TestDatabase::new();
    let users = seed(&test_db.db, &[("foo", 1)]);
    let id = users[0].id().unwrap();

    let other = Database::open(test_db.db_path()).unwrap();
    other
        .connection()
        .busy_timeout(StdDuration::from_millis(100))
        .unwrap();
    let mut other_session = other.session();
    let mut other_user = User::get_by_id(&other_session, id).unwrap().unwrap();

    // Lock taken inside an already open deferred transaction
    let mut session = test_db.db.session();
    session.begin().unwrap();
    User::get_for_update(&mut session, id).unwrap().unwrap();
    assert!(session.holds_write_lock());

    let err = other_user
        .update(&mut other_session, &[("age", Value::Integer(3))])
        .unwrap_err();
    assert!(is_busy(&err), "unexpected error {:?}", err);
    assert!(!other_session.in_transaction());

    session.commit().unwrap();
    other_user
        .update(&mut other_session, &[("age", Value::Integer(3))])
        .unwrap();

    // Lock taken by starting the transaction
    User::get_for_update(&mut session, id).unwrap().unwrap();
    let err = other_user
        .update(&mut other_session, &[("age", Value::Integer(4))])
        .unwrap_err();
    assert!(is_busy(&err), "unexpected error {:?}", err);

    drop(session);
    other_user
        .update(&mut other_session, &[("age", Value::Integer(4))])
        .unwrap();
    let stored = User::get_by_id(&test_db.db.session(), id).unwrap().unwrap();
    assert_eq!(stored.age(), Some(4));
}

#[test]
fn test_gets_without_matches() {
    let test_db = TestDatabase::in_memory();
    seed(&test_db.db, &[("foo", 12), ("bar", 20)]);
    let session = test_db.db.session();

    let (total, users) = User::gets(&session, &Query::new().filter("age", 99)).unwrap();
    assert_eq!(total, 0);
    assert!(users.is_empty());
    assert_eq!(User::count(&session, &Query::new().filter("age", 99)).unwrap(), 0);
}

#[test]
fn test_dropped_session_discards_lock() {
    let test_db = TestDatabase::in_memory();
    let users = seed(&test_db.db, &[("foo", 1)]);

    {
        let mut session = test_db.db.session();
        User::get_for_update(&mut session, users[0].id().unwrap()).unwrap();
        assert!(!test_db.db.connection().is_autocommit());
    }

    assert!(test_db.db.connection().is_autocommit());
}
